use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::BookingStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Dismissed,
}

impl DisputeStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Dismissed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dispute {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub raised_by: Uuid,
    pub reason: String,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OpenDisputeRequest {
    pub reason: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    /// `resolved` or `dismissed`
    pub status: DisputeStatus,
    pub resolution: String,
    /// Final state of the disputed booking: `completed` or `cancelled`
    pub booking_status: BookingStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisputeQuery {
    pub status: Option<DisputeStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
