use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::validation::{validate_rating, validate_text, MAX_REVIEW_COMMENT_LENGTH};
use crate::models::{
    page_limit, page_offset, BookingStatus, CreateReviewRequest, NewNotification, NotificationKind,
    PaginationQuery, Review,
};
use crate::services::booking_service::load_parties;
use crate::services::notification_service::push_notification;

const REVIEW_COLUMNS: &str = "id, booking_id, athlete_id, trainer_id, rating, comment, created_at";

#[derive(Clone)]
pub struct ReviewService {
    db: PgPool,
}

impl ReviewService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        athlete_id: Uuid,
        booking_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<Review, ServiceError> {
        validate_rating(request.rating).map_err(ServiceError::from_validation)?;
        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(comment) = &comment {
            validate_text(comment, "comment", MAX_REVIEW_COMMENT_LENGTH).map_err(ServiceError::from_validation)?;
        }

        let mut tx = self.db.begin().await?;
        let parties = load_parties(&mut *tx, booking_id, false).await?;

        if parties.booking.athlete_id != athlete_id {
            return Err(ServiceError::forbidden("Only the booking athlete can review it"));
        }
        if parties.booking.status != BookingStatus::Completed {
            return Err(ServiceError::validation("Only completed sessions can be reviewed"));
        }

        // booking_id is unique, a second review surfaces as 409
        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (booking_id, athlete_id, trainer_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(athlete_id)
        .bind(parties.booking.trainer_id)
        .bind(request.rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        push_notification(
            &mut *tx,
            NewNotification::new(
                parties.trainer_user_id,
                NotificationKind::ReviewReceived,
                "New review",
                format!("You received a {}-star review.", review.rating),
            )
            .with_data(json!({ "booking_id": booking_id, "review_id": review.id })),
        )
        .await?;

        tx.commit().await?;

        Ok(review)
    }

    pub async fn list_for_trainer(&self, trainer_id: Uuid, page: &PaginationQuery) -> Result<Vec<Review>, ServiceError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE trainer_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(trainer_id)
        .bind(page_limit(page.limit))
        .bind(page_offset(page.offset))
        .fetch_all(&self.db)
        .await?;

        Ok(reviews)
    }
}
