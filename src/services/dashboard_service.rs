use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{status_counts, AthleteDashboard, Booking, BookingStatus, TrainerDashboard};
use crate::services::booking_service::BOOKING_COLUMNS;

const UPCOMING_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn trainer_dashboard(&self, trainer_id: Uuid) -> Result<TrainerDashboard, ServiceError> {
        let rows = sqlx::query_as::<_, (BookingStatus, i64)>(
            "SELECT status, COUNT(*) FROM bookings WHERE trainer_id = $1 GROUP BY status",
        )
        .bind(trainer_id)
        .fetch_all(&self.db)
        .await?;

        let upcoming = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE trainer_id = $1 AND status IN {} AND starts_at > NOW()
             ORDER BY starts_at ASC LIMIT $2",
            BookingStatus::live_sql_list()
        ))
        .bind(trainer_id)
        .bind(UPCOMING_LIMIT)
        .fetch_all(&self.db)
        .await?;

        let (total_earnings_cents, pending_payout_cents) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT
                COALESCE(SUM(trainer_payout_cents) FILTER (WHERE status = 'completed'), 0)::BIGINT,
                COALESCE(SUM(trainer_payout_cents) FILTER (WHERE status = 'confirmed'), 0)::BIGINT
             FROM bookings
             WHERE trainer_id = $1 AND payment_status = 'paid'",
        )
        .bind(trainer_id)
        .fetch_one(&self.db)
        .await?;

        let (average_rating, review_count) = sqlx::query_as::<_, (f64, i64)>(
            "SELECT COALESCE(AVG(rating), 0)::float8, COUNT(*) FROM reviews WHERE trainer_id = $1",
        )
        .bind(trainer_id)
        .fetch_one(&self.db)
        .await?;

        Ok(TrainerDashboard {
            bookings_by_status: status_counts(rows),
            upcoming,
            total_earnings_cents,
            pending_payout_cents,
            average_rating,
            review_count,
        })
    }

    pub async fn athlete_dashboard(&self, athlete_id: Uuid) -> Result<AthleteDashboard, ServiceError> {
        let upcoming = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE athlete_id = $1 AND status IN {} AND starts_at > NOW()
             ORDER BY starts_at ASC LIMIT $2",
            BookingStatus::live_sql_list()
        ))
        .bind(athlete_id)
        .bind(UPCOMING_LIMIT)
        .fetch_all(&self.db)
        .await?;

        let (completed_sessions, total_spent_cents) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'completed'),
                COALESCE(SUM(price_cents) FILTER (WHERE payment_status = 'paid'), 0)::BIGINT
             FROM bookings WHERE athlete_id = $1",
        )
        .bind(athlete_id)
        .fetch_one(&self.db)
        .await?;

        let favorite_sport: Option<String> = sqlx::query_scalar(
            "SELECT sport FROM bookings
             WHERE athlete_id = $1 AND status = 'completed'
             GROUP BY sport ORDER BY COUNT(*) DESC, sport ASC LIMIT 1",
        )
        .bind(athlete_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(AthleteDashboard {
            upcoming,
            completed_sessions,
            total_spent_cents,
            favorite_sport,
        })
    }
}
