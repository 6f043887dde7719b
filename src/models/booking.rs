use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

pub const MIN_BOOKING_MINUTES: i32 = 30;
pub const MAX_BOOKING_MINUTES: i32 = 240;
/// Existing bookings are compared within this distance of the requested start
pub const CONFLICT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Rejected,
    NoShow,
    Disputed,
}

/// Who is asking for a booking status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingActor {
    Athlete,
    Trainer,
    Admin,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Rejected,
        BookingStatus::NoShow,
        BookingStatus::Disputed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Disputed => "disputed",
        }
    }

    /// Live bookings hold the trainer's time
    pub fn is_live(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// SQL list of the live statuses, for `status IN ...` filters
    pub fn live_sql_list() -> String {
        let names: Vec<String> = Self::ALL
            .iter()
            .filter(|status| status.is_live())
            .map(|status| format!("'{}'", status.as_str()))
            .collect();
        format!("({})", names.join(", "))
    }

    pub fn can_transition_to(&self, next: BookingStatus, actor: BookingActor) -> bool {
        use BookingActor::*;
        use BookingStatus::*;

        let allowed: &[BookingActor] = match (self, next) {
            (Pending, Confirmed) | (Pending, Rejected) => &[Trainer, Admin],
            (Pending, Cancelled) | (Confirmed, Cancelled) => &[Athlete, Trainer, Admin],
            (Confirmed, Completed) | (Confirmed, NoShow) => &[Trainer, Admin],
            (Confirmed, Disputed) | (Completed, Disputed) => &[Athlete, Trainer],
            (Disputed, Completed) | (Disputed, Cancelled) => &[Admin],
            _ => &[],
        };
        allowed.contains(&actor)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub trainer_id: Uuid,
    pub sub_account_id: Option<Uuid>,
    pub sport: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub ends_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub price_cents: i64,
    pub platform_fee_cents: i64,
    pub trainer_payout_cents: i64,
    pub payment_status: PaymentStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.starts_at, self.ends_at)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub trainer_id: Uuid,
    pub sub_account_id: Option<Uuid>,
    pub sport: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn from_duration(start: DateTime<Utc>, minutes: i32) -> Self {
        Self::new(start, start + Duration::minutes(minutes as i64))
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Money split for one booking, all in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub price_cents: i64,
    pub platform_fee_cents: i64,
    pub trainer_payout_cents: i64,
}

impl PriceBreakdown {
    /// Amounts are rounded half-up to the nearest cent
    pub fn compute(hourly_rate_cents: i64, duration_minutes: i32, fee_percent: u8) -> Self {
        let price_cents = (hourly_rate_cents * duration_minutes as i64 + 30) / 60;
        let platform_fee_cents = (price_cents * fee_percent as i64 + 50) / 100;
        Self {
            price_cents,
            platform_fee_cents,
            trainer_payout_cents: price_cents - platform_fee_cents,
        }
    }
}

pub fn validate_duration(minutes: i32) -> anyhow::Result<()> {
    if !(MIN_BOOKING_MINUTES..=MAX_BOOKING_MINUTES).contains(&minutes) {
        anyhow::bail!(
            "duration_minutes must be between {} and {}",
            MIN_BOOKING_MINUTES,
            MAX_BOOKING_MINUTES
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 17, h, m, 0).unwrap()
    }

    #[test]
    fn test_back_to_back_sessions_do_not_overlap() {
        let first = TimeRange::from_duration(at(9, 0), 60);
        let second = TimeRange::from_duration(at(10, 0), 60);
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn test_partial_and_nested_overlap() {
        let base = TimeRange::from_duration(at(9, 0), 90);
        assert!(base.overlaps(&TimeRange::from_duration(at(10, 0), 60)));
        assert!(base.overlaps(&TimeRange::from_duration(at(9, 15), 30)));
        assert!(base.overlaps(&TimeRange::from_duration(at(8, 0), 240)));
    }

    #[test]
    fn test_live_sql_list_matches_is_live() {
        assert_eq!(BookingStatus::live_sql_list(), "('pending', 'confirmed')");
        assert!(!BookingStatus::Disputed.is_live());
        assert!(!BookingStatus::Completed.is_live());
    }

    #[test]
    fn test_trainer_lifecycle_transitions() {
        use BookingActor::*;
        use BookingStatus::*;

        assert!(Pending.can_transition_to(Confirmed, Trainer));
        assert!(!Pending.can_transition_to(Confirmed, Athlete));
        assert!(Pending.can_transition_to(Rejected, Trainer));
        assert!(Pending.can_transition_to(Cancelled, Athlete));
        assert!(Confirmed.can_transition_to(Completed, Trainer));
        assert!(!Confirmed.can_transition_to(Completed, Athlete));
        assert!(Confirmed.can_transition_to(NoShow, Trainer));
        assert!(Completed.can_transition_to(Disputed, Athlete));
        assert!(!Disputed.can_transition_to(Completed, Trainer));
        assert!(Disputed.can_transition_to(Cancelled, Admin));
    }

    #[test]
    fn test_terminal_states_stay_terminal() {
        for terminal in [BookingStatus::Cancelled, BookingStatus::Rejected, BookingStatus::NoShow] {
            for next in BookingStatus::ALL {
                for actor in [BookingActor::Athlete, BookingActor::Trainer, BookingActor::Admin] {
                    assert!(!terminal.can_transition_to(next, actor), "{terminal} -> {next}");
                }
            }
        }
    }

    #[test]
    fn test_price_breakdown() {
        let breakdown = PriceBreakdown::compute(8000, 90, 15);
        assert_eq!(breakdown.price_cents, 12000);
        assert_eq!(breakdown.platform_fee_cents, 1800);
        assert_eq!(breakdown.trainer_payout_cents, 10200);
    }

    #[test]
    fn test_price_breakdown_rounds_to_cent() {
        // 45 minutes at 33.33/h = 24.9975 -> 25.00; 15% fee = 3.75
        let breakdown = PriceBreakdown::compute(3333, 45, 15);
        assert_eq!(breakdown.price_cents, 2500);
        assert_eq!(breakdown.platform_fee_cents, 375);
        assert_eq!(
            breakdown.price_cents,
            breakdown.platform_fee_cents + breakdown.trainer_payout_cents
        );
    }

    #[test]
    fn test_duration_bounds() {
        assert!(validate_duration(30).is_ok());
        assert!(validate_duration(240).is_ok());
        assert!(validate_duration(29).is_err());
        assert!(validate_duration(241).is_err());
    }
}
