use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{AvailabilitySlot, Review};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub hourly_rate_cents: i64,
    pub years_experience: i32,
    pub certifications: Vec<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertTrainerProfile {
    pub bio: Option<String>,
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub hourly_rate_cents: i64,
    pub years_experience: i32,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub is_active: Option<bool>,
}

/// Trainer profile joined with its owner's name and review aggregates
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainerListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub hourly_rate_cents: i64,
    pub years_experience: i32,
    pub certifications: Vec<String>,
    pub is_verified: bool,
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrainerSearchQuery {
    pub sport: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub max_rate_cents: Option<i64>,
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub verified_only: bool,
    /// Free-text match against trainer name and bio
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredTrainer {
    pub trainer: TrainerListing,
    pub match_score: u8,
}

#[derive(Debug, Serialize)]
pub struct TrainerDetail {
    pub trainer: TrainerListing,
    pub availability: Vec<AvailabilitySlot>,
    pub recent_reviews: Vec<Review>,
}
