use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::validation::{normalize_sports, validate_hourly_rate, validate_sports};
use crate::models::{
    AvailabilitySlot, NewNotification, NotificationKind, Review, TrainerDetail, TrainerListing, TrainerProfile,
    UpsertTrainerProfile,
};
use crate::services::matching_service::LISTING_SELECT;
use crate::services::notification_service::push_notification;

pub(crate) const TRAINER_COLUMNS: &str = "id, user_id, bio, sports, city, state, hourly_rate_cents, \
     years_experience, certifications, is_verified, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct TrainerProfileService {
    db: PgPool,
}

impl TrainerProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<TrainerProfile>, ServiceError> {
        let profile = sqlx::query_as::<_, TrainerProfile>(&format!(
            "SELECT {TRAINER_COLUMNS} FROM trainer_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    /// Trainer profile of the caller, or 404 when they have not created one yet
    pub async fn require_for_user(&self, user_id: Uuid) -> Result<TrainerProfile, ServiceError> {
        self.get_by_user_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("Trainer profile"))
    }

    pub async fn upsert(&self, user_id: Uuid, request: UpsertTrainerProfile) -> Result<TrainerProfile, ServiceError> {
        validate_sports(&request.sports).map_err(ServiceError::from_validation)?;
        validate_hourly_rate(request.hourly_rate_cents).map_err(ServiceError::from_validation)?;
        if request.years_experience < 0 || request.years_experience > 80 {
            return Err(ServiceError::validation("years_experience must be between 0 and 80"));
        }

        let profile = sqlx::query_as::<_, TrainerProfile>(&format!(
            "INSERT INTO trainer_profiles
                (user_id, bio, sports, city, state, hourly_rate_cents, years_experience, certifications, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, TRUE))
             ON CONFLICT (user_id) DO UPDATE SET
                bio = EXCLUDED.bio,
                sports = EXCLUDED.sports,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                hourly_rate_cents = EXCLUDED.hourly_rate_cents,
                years_experience = EXCLUDED.years_experience,
                certifications = EXCLUDED.certifications,
                is_active = COALESCE($9, trainer_profiles.is_active),
                updated_at = NOW()
             RETURNING {TRAINER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(request.bio.unwrap_or_default())
        .bind(normalize_sports(&request.sports))
        .bind(request.city.map(|c| c.trim().to_string()))
        .bind(request.state.map(|s| s.trim().to_string()))
        .bind(request.hourly_rate_cents)
        .bind(request.years_experience)
        .bind(request.certifications)
        .bind(request.is_active)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(trainer_id = %profile.id, "trainer profile saved");

        Ok(profile)
    }

    pub async fn get_listing(&self, trainer_id: Uuid) -> Result<TrainerListing, ServiceError> {
        sqlx::query_as::<_, TrainerListing>(&format!("{LISTING_SELECT} WHERE t.id = $1"))
            .bind(trainer_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(ServiceError::NotFound("Trainer"))
    }

    /// Public trainer page: listing, active weekly slots and latest reviews
    pub async fn get_detail(&self, trainer_id: Uuid) -> Result<TrainerDetail, ServiceError> {
        let trainer = self.get_listing(trainer_id).await?;

        let availability = sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT id, trainer_id, day_of_week, start_time, end_time, is_active, created_at, updated_at
             FROM availability_slots WHERE trainer_id = $1 AND is_active
             ORDER BY day_of_week, start_time",
        )
        .bind(trainer_id)
        .fetch_all(&self.db)
        .await?;

        let recent_reviews = sqlx::query_as::<_, Review>(
            "SELECT id, booking_id, athlete_id, trainer_id, rating, comment, created_at
             FROM reviews WHERE trainer_id = $1 ORDER BY created_at DESC LIMIT 5",
        )
        .bind(trainer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(TrainerDetail {
            trainer,
            availability,
            recent_reviews,
        })
    }

    pub async fn set_verified(&self, trainer_id: Uuid, verified: bool) -> Result<TrainerProfile, ServiceError> {
        let mut tx = self.db.begin().await?;

        let profile = sqlx::query_as::<_, TrainerProfile>(&format!(
            "UPDATE trainer_profiles SET is_verified = $2, updated_at = NOW()
             WHERE id = $1 RETURNING {TRAINER_COLUMNS}"
        ))
        .bind(trainer_id)
        .bind(verified)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::NotFound("Trainer"))?;

        if verified {
            push_notification(
                &mut *tx,
                NewNotification::new(
                    profile.user_id,
                    NotificationKind::TrainerVerified,
                    "Profile verified",
                    "Your trainer profile is now verified.",
                ),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::warn!(trainer_id = %trainer_id, verified, "trainer verification changed");

        Ok(profile)
    }
}
