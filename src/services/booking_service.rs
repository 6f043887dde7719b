//! Booking creation and lifecycle.
//!
//! Creation runs inside one transaction that locks the trainer profile row, so
//! two requests for the same trainer are checked one after the other. The
//! `bookings_no_overlap` exclusion constraint catches anything that slips past.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::{UserRole, UserSession};
use crate::errors::ServiceError;
use crate::models::validation::{eq_folded, validate_text};
use crate::models::{
    find_covering_slot, page_limit, page_offset, validate_duration, AvailabilitySlot, Booking, BookingActor,
    BookingQuery, BookingStatus, CreateBookingRequest, NewNotification, NotificationKind, PaymentStatus,
    PriceBreakdown, TimeRange, UpdateBookingStatusRequest, CONFLICT_WINDOW_HOURS,
};
use crate::services::notification_service::push_notification;

pub(crate) const BOOKING_COLUMNS: &str = "id, athlete_id, trainer_id, sub_account_id, sport, starts_at, \
     duration_minutes, ends_at, status, price_cents, platform_fee_cents, trainer_payout_cents, \
     payment_status, location, notes, created_at, updated_at";

const MAX_NOTES_LENGTH: usize = 1000;

/// Trainer row as seen under the booking lock
#[derive(Debug, FromRow)]
struct BookableTrainer {
    id: Uuid,
    user_id: Uuid,
    sports: Vec<String>,
    hourly_rate_cents: i64,
    accepting: bool,
}

/// A booking plus the user account behind its trainer profile
#[derive(Debug, Clone)]
pub struct BookingParties {
    pub booking: Booking,
    pub trainer_user_id: Uuid,
}

impl BookingParties {
    /// Which side of the booking `user_id` is on, if any
    pub fn actor_for(&self, session: &UserSession) -> Option<BookingActor> {
        if session.user_id == self.booking.athlete_id {
            Some(BookingActor::Athlete)
        } else if session.user_id == self.trainer_user_id {
            Some(BookingActor::Trainer)
        } else if session.is_admin() {
            Some(BookingActor::Admin)
        } else {
            None
        }
    }

    pub fn counterpart_of(&self, user_id: Uuid) -> Vec<Uuid> {
        if user_id == self.booking.athlete_id {
            vec![self.trainer_user_id]
        } else if user_id == self.trainer_user_id {
            vec![self.booking.athlete_id]
        } else {
            vec![self.booking.athlete_id, self.trainer_user_id]
        }
    }
}

fn notification_kind_for(status: BookingStatus) -> NotificationKind {
    match status {
        BookingStatus::Pending => NotificationKind::BookingRequested,
        BookingStatus::Confirmed => NotificationKind::BookingConfirmed,
        BookingStatus::Rejected => NotificationKind::BookingRejected,
        BookingStatus::Cancelled => NotificationKind::BookingCancelled,
        BookingStatus::Completed => NotificationKind::BookingCompleted,
        BookingStatus::NoShow => NotificationKind::BookingNoShow,
        BookingStatus::Disputed => NotificationKind::DisputeOpened,
    }
}

/// Whether `requested` overlaps any live booking in `existing`
fn conflicts_with(requested: &TimeRange, existing: &[Booking]) -> bool {
    existing
        .iter()
        .filter(|booking| booking.status.is_live())
        .any(|booking| requested.overlaps(&booking.time_range()))
}

/// Case-insensitive sport match, Unicode aware
fn coaches_sport(trainer_sports: &[String], sport: &str) -> bool {
    trainer_sports.iter().any(|s| eq_folded(s, sport))
}

/// Rules for a change made through the status endpoint
fn check_status_change(
    current: BookingStatus,
    next: BookingStatus,
    actor: BookingActor,
    starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if next == BookingStatus::Disputed || current == BookingStatus::Disputed {
        return Err(ServiceError::validation("Disputed bookings are handled through the dispute endpoints"));
    }
    if !current.can_transition_to(next, actor) {
        return Err(ServiceError::InvalidTransition { from: current, to: next });
    }
    if matches!(next, BookingStatus::Completed | BookingStatus::NoShow) && starts_at > now {
        return Err(ServiceError::validation("Session has not started yet"));
    }
    Ok(())
}

/// Load a booking with its trainer's user id, optionally locking the booking row
pub(crate) async fn load_parties<'e, E>(executor: E, booking_id: Uuid, lock: bool) -> Result<BookingParties, ServiceError>
where
    E: PgExecutor<'e>,
{
    #[derive(FromRow)]
    struct Row {
        #[sqlx(flatten)]
        booking: Booking,
        trainer_user_id: Uuid,
    }

    let columns = BOOKING_COLUMNS
        .split(", ")
        .map(|column| format!("b.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns}, t.user_id AS trainer_user_id
         FROM bookings b JOIN trainer_profiles t ON t.id = b.trainer_id
         WHERE b.id = $1{}",
        if lock { " FOR UPDATE OF b" } else { "" }
    );

    let row = sqlx::query_as::<_, Row>(&sql)
        .bind(booking_id)
        .fetch_optional(executor)
        .await?
        .ok_or(ServiceError::NotFound("Booking"))?;

    Ok(BookingParties {
        booking: row.booking,
        trainer_user_id: row.trainer_user_id,
    })
}

/// Write a new booking status. Cancelling a paid booking refunds it.
pub(crate) async fn write_status<'e, E>(executor: E, booking_id: Uuid, status: BookingStatus) -> Result<Booking, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Booking>(&format!(
        "UPDATE bookings SET
            status = $2,
            payment_status = CASE
                WHEN $3 AND payment_status = 'paid' THEN 'refunded'::payment_status
                ELSE payment_status
            END,
            updated_at = NOW()
         WHERE id = $1
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(booking_id)
    .bind(status)
    .bind(status == BookingStatus::Cancelled)
    .fetch_one(executor)
    .await
}

#[derive(Clone)]
pub struct BookingService {
    db: PgPool,
    platform_fee_percent: u8,
}

impl BookingService {
    pub fn new(db: PgPool, platform_fee_percent: u8) -> Self {
        Self {
            db,
            platform_fee_percent,
        }
    }

    #[tracing::instrument(skip(self, request), fields(trainer_id = %request.trainer_id))]
    pub async fn create(&self, athlete_id: Uuid, request: CreateBookingRequest) -> Result<Booking, ServiceError> {
        validate_duration(request.duration_minutes).map_err(ServiceError::from_validation)?;
        if request.starts_at <= Utc::now() {
            return Err(ServiceError::validation("starts_at must be in the future"));
        }
        let sport = request.sport.trim().to_lowercase();
        if sport.is_empty() {
            return Err(ServiceError::validation("sport is required"));
        }
        if let Some(notes) = &request.notes {
            validate_text(notes, "notes", MAX_NOTES_LENGTH).map_err(ServiceError::from_validation)?;
        }

        let requested = TimeRange::from_duration(request.starts_at, request.duration_minutes);

        let mut tx = self.db.begin().await?;

        let trainer = sqlx::query_as::<_, BookableTrainer>(
            "SELECT t.id, t.user_id, t.sports, t.hourly_rate_cents, (t.is_active AND u.is_active) AS accepting
             FROM trainer_profiles t JOIN users u ON u.id = t.user_id
             WHERE t.id = $1
             FOR UPDATE OF t",
        )
        .bind(request.trainer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::NotFound("Trainer"))?;

        if !trainer.accepting {
            return Err(ServiceError::validation("Trainer is not accepting bookings"));
        }
        if trainer.user_id == athlete_id {
            return Err(ServiceError::validation("You cannot book a session with yourself"));
        }
        if !coaches_sport(&trainer.sports, &sport) {
            return Err(ServiceError::validation(format!("Trainer does not coach {sport}")));
        }

        if let Some(sub_account_id) = request.sub_account_id {
            let owned: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM sub_accounts WHERE id = $1 AND parent_user_id = $2)",
            )
            .bind(sub_account_id)
            .bind(athlete_id)
            .fetch_one(&mut *tx)
            .await?;
            if !owned {
                return Err(ServiceError::NotFound("Sub-account"));
            }
        }

        let slots = sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT id, trainer_id, day_of_week, start_time, end_time, is_active, created_at, updated_at
             FROM availability_slots WHERE trainer_id = $1 AND is_active",
        )
        .bind(trainer.id)
        .fetch_all(&mut *tx)
        .await?;

        if find_covering_slot(&slots, requested.start, requested.end).is_none() {
            return Err(ServiceError::conflict("requested time is outside the trainer's availability"));
        }

        let window = Duration::hours(CONFLICT_WINDOW_HOURS);
        let nearby = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE trainer_id = $1
               AND status IN {}
               AND starts_at BETWEEN $2 AND $3",
            BookingStatus::live_sql_list()
        ))
        .bind(trainer.id)
        .bind(requested.start - window)
        .bind(requested.start + window)
        .fetch_all(&mut *tx)
        .await?;

        if conflicts_with(&requested, &nearby) {
            return Err(ServiceError::conflict("trainer already has a booking in that time range"));
        }

        let price = PriceBreakdown::compute(trainer.hourly_rate_cents, request.duration_minutes, self.platform_fee_percent);

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings
                (athlete_id, trainer_id, sub_account_id, sport, starts_at, duration_minutes, ends_at,
                 status, price_cents, platform_fee_cents, trainer_payout_cents, location, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $10, $11, $12)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(athlete_id)
        .bind(trainer.id)
        .bind(request.sub_account_id)
        .bind(&sport)
        .bind(requested.start)
        .bind(request.duration_minutes)
        .bind(requested.end)
        .bind(price.price_cents)
        .bind(price.platform_fee_cents)
        .bind(price.trainer_payout_cents)
        .bind(request.location)
        .bind(request.notes)
        .fetch_one(&mut *tx)
        .await?;

        push_notification(
            &mut *tx,
            NewNotification::new(
                trainer.user_id,
                NotificationKind::BookingRequested,
                "New booking request",
                format!(
                    "A {} minute {} session was requested for {}.",
                    booking.duration_minutes,
                    booking.sport,
                    booking.starts_at.format("%Y-%m-%d %H:%M UTC")
                ),
            )
            .with_data(json!({ "booking_id": booking.id })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(booking_id = %booking.id, price_cents = booking.price_cents, "booking created");

        Ok(booking)
    }

    /// A booking visible to participants and admins
    pub async fn get(&self, session: &UserSession, booking_id: Uuid) -> Result<Booking, ServiceError> {
        let parties = load_parties(&self.db, booking_id, false).await?;
        if parties.actor_for(session).is_none() {
            return Err(ServiceError::NotFound("Booking"));
        }
        Ok(parties.booking)
    }

    /// Bookings of the caller: as athlete, as trainer, or all of them for admins
    pub async fn list(&self, session: &UserSession, query: &BookingQuery) -> Result<Vec<Booking>, ServiceError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE TRUE"));

        match session.role {
            UserRole::Admin => {}
            UserRole::Trainer => {
                builder
                    .push(" AND trainer_id IN (SELECT id FROM trainer_profiles WHERE user_id = ")
                    .push_bind(session.user_id)
                    .push(")");
            }
            UserRole::Athlete => {
                builder.push(" AND athlete_id = ").push_bind(session.user_id);
            }
        }

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = query.from {
            builder.push(" AND starts_at >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND starts_at < ").push_bind(to);
        }

        builder
            .push(" ORDER BY starts_at DESC LIMIT ")
            .push_bind(page_limit(query.limit))
            .push(" OFFSET ")
            .push_bind(page_offset(query.offset));

        let bookings = builder.build_query_as::<Booking>().fetch_all(&self.db).await?;

        Ok(bookings)
    }

    #[tracing::instrument(skip(self, session, request), fields(user_id = %session.user_id))]
    pub async fn update_status(
        &self,
        session: &UserSession,
        booking_id: Uuid,
        request: UpdateBookingStatusRequest,
    ) -> Result<Booking, ServiceError> {
        let next = request.status;

        let mut tx = self.db.begin().await?;
        let parties = load_parties(&mut *tx, booking_id, true).await?;
        let current = parties.booking.status;

        let actor = parties
            .actor_for(session)
            .ok_or(ServiceError::NotFound("Booking"))?;

        check_status_change(current, next, actor, parties.booking.starts_at, Utc::now())?;

        let booking = write_status(&mut *tx, booking_id, next).await?;

        let mut message = format!(
            "Your {} session on {} is now {}.",
            booking.sport,
            booking.starts_at.format("%Y-%m-%d %H:%M UTC"),
            next
        );
        if let Some(reason) = request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            message.push_str(&format!(" Reason: {reason}"));
        }

        for recipient in parties.counterpart_of(session.user_id) {
            push_notification(
                &mut *tx,
                NewNotification::new(recipient, notification_kind_for(next), "Booking updated", message.clone())
                    .with_data(json!({ "booking_id": booking.id, "status": next })),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(booking_id = %booking_id, from = %current, to = %next, "booking status changed");

        Ok(booking)
    }

    /// Athlete records payment for a confirmed booking
    pub async fn mark_paid(&self, session: &UserSession, booking_id: Uuid) -> Result<Booking, ServiceError> {
        let mut tx = self.db.begin().await?;
        let parties = load_parties(&mut *tx, booking_id, true).await?;

        if parties.actor_for(session) != Some(BookingActor::Athlete) {
            return Err(ServiceError::forbidden("Only the booking athlete can pay for it"));
        }
        if parties.booking.status != BookingStatus::Confirmed {
            return Err(ServiceError::validation("Only confirmed bookings can be paid"));
        }
        if parties.booking.payment_status != PaymentStatus::Unpaid {
            return Err(ServiceError::conflict("Booking is already paid"));
        }

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET payment_status = 'paid', updated_at = NOW()
             WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        push_notification(
            &mut *tx,
            NewNotification::new(
                parties.trainer_user_id,
                NotificationKind::PaymentReceived,
                "Payment received",
                format!(
                    "Payment recorded for the {} session. Your payout is {}.{:02}.",
                    booking.sport,
                    booking.trainer_payout_cents / 100,
                    booking.trainer_payout_cents % 100
                ),
            )
            .with_data(json!({ "booking_id": booking.id })),
        )
        .await?;

        tx.commit().await?;

        Ok(booking)
    }

    /// Cancel pending bookings whose start time has passed without confirmation
    pub async fn expire_stale_pending(&self) -> Result<u64, ServiceError> {
        let mut tx = self.db.begin().await?;

        let expired = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String)>(
            "UPDATE bookings b SET status = 'cancelled', updated_at = NOW()
             FROM trainer_profiles t
             WHERE t.id = b.trainer_id AND b.status = 'pending' AND b.starts_at <= NOW()
             RETURNING b.id, b.athlete_id, t.user_id, b.sport",
        )
        .fetch_all(&mut *tx)
        .await?;

        for (booking_id, athlete_id, trainer_user_id, sport) in &expired {
            for recipient in [*athlete_id, *trainer_user_id] {
                push_notification(
                    &mut *tx,
                    NewNotification::new(
                        recipient,
                        NotificationKind::BookingExpired,
                        "Booking expired",
                        format!("The {sport} session request expired before it was confirmed."),
                    )
                    .with_data(json!({ "booking_id": booking_id })),
                )
                .await?;
            }
        }

        tx.commit().await?;

        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn parties() -> BookingParties {
        let start = Utc.with_ymd_and_hms(2024, 6, 17, 10, 0, 0).unwrap();
        BookingParties {
            booking: Booking {
                id: Uuid::new_v4(),
                athlete_id: Uuid::new_v4(),
                trainer_id: Uuid::new_v4(),
                sub_account_id: None,
                sport: "tennis".to_string(),
                starts_at: start,
                duration_minutes: 60,
                ends_at: start + Duration::minutes(60),
                status: BookingStatus::Pending,
                price_cents: 8000,
                platform_fee_cents: 1200,
                trainer_payout_cents: 6800,
                payment_status: PaymentStatus::Unpaid,
                location: None,
                notes: None,
                created_at: start,
                updated_at: start,
            },
            trainer_user_id: Uuid::new_v4(),
        }
    }

    fn session(user_id: Uuid, role: UserRole) -> UserSession {
        UserSession {
            user_id,
            email: "someone@example.com".to_string(),
            role,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_actor_follows_booking_side_not_role() {
        let parties = parties();
        let athlete = session(parties.booking.athlete_id, UserRole::Athlete);
        let trainer = session(parties.trainer_user_id, UserRole::Trainer);
        let admin = session(Uuid::new_v4(), UserRole::Admin);
        let stranger = session(Uuid::new_v4(), UserRole::Trainer);

        assert_eq!(parties.actor_for(&athlete), Some(BookingActor::Athlete));
        assert_eq!(parties.actor_for(&trainer), Some(BookingActor::Trainer));
        assert_eq!(parties.actor_for(&admin), Some(BookingActor::Admin));
        assert_eq!(parties.actor_for(&stranger), None);
    }

    #[test]
    fn test_counterpart_of_each_side() {
        let parties = parties();
        assert_eq!(parties.counterpart_of(parties.booking.athlete_id), vec![parties.trainer_user_id]);
        assert_eq!(parties.counterpart_of(parties.trainer_user_id), vec![parties.booking.athlete_id]);
        assert_eq!(parties.counterpart_of(Uuid::new_v4()).len(), 2);
    }

    #[test]
    fn test_notification_kind_per_status() {
        assert_eq!(notification_kind_for(BookingStatus::Confirmed), NotificationKind::BookingConfirmed);
        assert_eq!(notification_kind_for(BookingStatus::NoShow), NotificationKind::BookingNoShow);
    }

    #[test]
    fn test_disputed_booking_cannot_move_through_status_changes() {
        let start = Utc.with_ymd_and_hms(2024, 6, 17, 10, 0, 0).unwrap();
        let later = start + Duration::days(1);

        for actor in [BookingActor::Athlete, BookingActor::Trainer, BookingActor::Admin] {
            for next in [BookingStatus::Completed, BookingStatus::Cancelled] {
                assert_matches!(
                    check_status_change(BookingStatus::Disputed, next, actor, start, later),
                    Err(ServiceError::Validation(_))
                );
            }
        }
        assert_matches!(
            check_status_change(BookingStatus::Confirmed, BookingStatus::Disputed, BookingActor::Athlete, start, later),
            Err(ServiceError::Validation(_))
        );
    }

    #[test]
    fn test_status_change_rules() {
        let start = Utc.with_ymd_and_hms(2024, 6, 17, 10, 0, 0).unwrap();
        let before = start - Duration::hours(1);
        let after = start + Duration::hours(2);

        assert!(check_status_change(BookingStatus::Pending, BookingStatus::Confirmed, BookingActor::Trainer, start, before).is_ok());
        assert_matches!(
            check_status_change(BookingStatus::Pending, BookingStatus::Confirmed, BookingActor::Athlete, start, before),
            Err(ServiceError::InvalidTransition { .. })
        );
        assert_matches!(
            check_status_change(BookingStatus::Confirmed, BookingStatus::Completed, BookingActor::Trainer, start, before),
            Err(ServiceError::Validation(_))
        );
        assert!(check_status_change(BookingStatus::Confirmed, BookingStatus::Completed, BookingActor::Trainer, start, after).is_ok());
    }

    #[test]
    fn test_conflicts_only_with_live_bookings() {
        let existing = parties().booking;
        let requested = TimeRange::from_duration(existing.starts_at + Duration::minutes(30), 60);

        assert!(conflicts_with(&requested, std::slice::from_ref(&existing)));

        let cancelled = Booking {
            status: BookingStatus::Cancelled,
            ..existing.clone()
        };
        assert!(!conflicts_with(&requested, &[cancelled]));

        let back_to_back = TimeRange::from_duration(existing.ends_at, 60);
        assert!(!conflicts_with(&back_to_back, &[existing]));
    }

    #[test]
    fn test_sport_match_is_unicode_case_insensitive() {
        let sports = vec!["Über-Fitness".to_string(), "Tennis".to_string()];

        assert!(coaches_sport(&sports, "über-fitness"));
        assert!(coaches_sport(&sports, "ÜBER-FITNESS"));
        assert!(coaches_sport(&sports, " tennis "));
        assert!(!coaches_sport(&sports, "golf"));
    }
}
