use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::UserSession;
use crate::errors::ServiceError;
use crate::models::validation::validate_text;
use crate::models::{
    page_limit, page_offset, BookingActor, BookingStatus, Dispute, DisputeQuery, DisputeStatus, NewNotification,
    NotificationKind, OpenDisputeRequest, ResolveDisputeRequest,
};
use crate::services::booking_service::{load_parties, write_status};
use crate::services::notification_service::push_notification;

const DISPUTE_COLUMNS: &str =
    "id, booking_id, raised_by, reason, description, status, resolution, resolved_by, resolved_at, created_at, updated_at";
const MAX_REASON_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 5000;

#[derive(Clone)]
pub struct DisputeService {
    db: PgPool,
}

impl DisputeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// A participant disputes a confirmed or completed booking
    #[tracing::instrument(skip(self, session, request), fields(user_id = %session.user_id))]
    pub async fn open(
        &self,
        session: &UserSession,
        booking_id: Uuid,
        request: OpenDisputeRequest,
    ) -> Result<Dispute, ServiceError> {
        validate_text(&request.reason, "reason", MAX_REASON_LENGTH).map_err(ServiceError::from_validation)?;
        validate_text(&request.description, "description", MAX_DESCRIPTION_LENGTH)
            .map_err(ServiceError::from_validation)?;

        let mut tx = self.db.begin().await?;
        let parties = load_parties(&mut *tx, booking_id, true).await?;

        let actor = match parties.actor_for(session) {
            Some(BookingActor::Athlete) => BookingActor::Athlete,
            Some(BookingActor::Trainer) => BookingActor::Trainer,
            Some(BookingActor::Admin) => {
                return Err(ServiceError::forbidden("Only booking participants can open a dispute"))
            }
            None => return Err(ServiceError::NotFound("Booking")),
        };

        let current = parties.booking.status;
        if !current.can_transition_to(BookingStatus::Disputed, actor) {
            return Err(ServiceError::InvalidTransition {
                from: current,
                to: BookingStatus::Disputed,
            });
        }

        let dispute = sqlx::query_as::<_, Dispute>(&format!(
            "INSERT INTO disputes (booking_id, raised_by, reason, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {DISPUTE_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(session.user_id)
        .bind(request.reason.trim())
        .bind(request.description.trim())
        .fetch_one(&mut *tx)
        .await?;

        write_status(&mut *tx, booking_id, BookingStatus::Disputed).await?;

        for recipient in parties.counterpart_of(session.user_id) {
            push_notification(
                &mut *tx,
                NewNotification::new(
                    recipient,
                    NotificationKind::DisputeOpened,
                    "Dispute opened",
                    format!("A dispute was opened on your {} session: {}", parties.booking.sport, dispute.reason),
                )
                .with_data(json!({ "booking_id": booking_id, "dispute_id": dispute.id })),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::warn!(dispute_id = %dispute.id, booking_id = %booking_id, "dispute opened");

        Ok(dispute)
    }

    pub async fn list(&self, query: &DisputeQuery) -> Result<Vec<Dispute>, ServiceError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {DISPUTE_COLUMNS} FROM disputes WHERE TRUE"));
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY created_at ASC LIMIT ")
            .push_bind(page_limit(query.limit))
            .push(" OFFSET ")
            .push_bind(page_offset(query.offset));

        let disputes = builder.build_query_as::<Dispute>().fetch_all(&self.db).await?;

        Ok(disputes)
    }

    pub async fn start_review(&self, dispute_id: Uuid) -> Result<Dispute, ServiceError> {
        let mut tx = self.db.begin().await?;
        let dispute = lock_dispute(&mut tx, dispute_id).await?;

        if dispute.status != DisputeStatus::Open {
            return Err(ServiceError::conflict("Only open disputes can be moved to review"));
        }

        let dispute = sqlx::query_as::<_, Dispute>(&format!(
            "UPDATE disputes SET status = 'under_review', updated_at = NOW()
             WHERE id = $1 RETURNING {DISPUTE_COLUMNS}"
        ))
        .bind(dispute_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(dispute)
    }

    /// Close the dispute and settle the booking as completed or cancelled
    #[tracing::instrument(skip(self, request))]
    pub async fn resolve(
        &self,
        admin_id: Uuid,
        dispute_id: Uuid,
        request: ResolveDisputeRequest,
    ) -> Result<Dispute, ServiceError> {
        if !request.status.is_closed() {
            return Err(ServiceError::validation("status must be resolved or dismissed"));
        }
        if !matches!(request.booking_status, BookingStatus::Completed | BookingStatus::Cancelled) {
            return Err(ServiceError::validation("booking_status must be completed or cancelled"));
        }
        validate_text(&request.resolution, "resolution", MAX_DESCRIPTION_LENGTH)
            .map_err(ServiceError::from_validation)?;

        let mut tx = self.db.begin().await?;
        let dispute = lock_dispute(&mut tx, dispute_id).await?;

        if dispute.status.is_closed() {
            return Err(ServiceError::conflict("Dispute is already closed"));
        }

        let parties = load_parties(&mut *tx, dispute.booking_id, true).await?;
        let current = parties.booking.status;
        if !current.can_transition_to(request.booking_status, BookingActor::Admin) {
            return Err(ServiceError::InvalidTransition {
                from: current,
                to: request.booking_status,
            });
        }

        let dispute = sqlx::query_as::<_, Dispute>(&format!(
            "UPDATE disputes
             SET status = $2, resolution = $3, resolved_by = $4, resolved_at = NOW(), updated_at = NOW()
             WHERE id = $1 RETURNING {DISPUTE_COLUMNS}"
        ))
        .bind(dispute_id)
        .bind(request.status)
        .bind(request.resolution.trim())
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        let booking = write_status(&mut *tx, dispute.booking_id, request.booking_status).await?;

        for recipient in [booking.athlete_id, parties.trainer_user_id] {
            push_notification(
                &mut *tx,
                NewNotification::new(
                    recipient,
                    NotificationKind::DisputeResolved,
                    "Dispute closed",
                    format!(
                        "The dispute on your {} session was closed. The booking is now {}.",
                        booking.sport, booking.status
                    ),
                )
                .with_data(json!({ "booking_id": booking.id, "dispute_id": dispute.id })),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(dispute_id = %dispute_id, booking_status = %booking.status, "dispute closed");

        Ok(dispute)
    }
}

async fn lock_dispute(tx: &mut sqlx::Transaction<'_, Postgres>, dispute_id: Uuid) -> Result<Dispute, ServiceError> {
    sqlx::query_as::<_, Dispute>(&format!(
        "SELECT {DISPUTE_COLUMNS} FROM disputes WHERE id = $1 FOR UPDATE"
    ))
    .bind(dispute_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(ServiceError::NotFound("Dispute"))
}
