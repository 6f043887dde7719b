use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AthleteProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub budget_cents: Option<i64>,
    pub skill_level: Option<String>,
    pub goals: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertAthleteProfile {
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub budget_cents: Option<i64>,
    pub skill_level: Option<String>,
    pub goals: Option<String>,
}

/// A dependent (typically a minor) an athlete books sessions for
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubAccount {
    pub id: Uuid,
    pub parent_user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub relationship: String,
    pub sports: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubAccount {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub relationship: String,
    #[serde(default)]
    pub sports: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubAccount {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub relationship: Option<String>,
    pub sports: Option<Vec<String>>,
}
