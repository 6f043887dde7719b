use serde::Serialize;
use std::collections::BTreeMap;

use super::{Booking, BookingStatus};

#[derive(Debug, Serialize)]
pub struct TrainerDashboard {
    pub bookings_by_status: BTreeMap<String, i64>,
    pub upcoming: Vec<Booking>,
    pub total_earnings_cents: i64,
    pub pending_payout_cents: i64,
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Serialize)]
pub struct AthleteDashboard {
    pub upcoming: Vec<Booking>,
    pub completed_sessions: i64,
    pub total_spent_cents: i64,
    pub favorite_sport: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users_by_role: BTreeMap<String, i64>,
    pub active_trainers: i64,
    pub verified_trainers: i64,
    pub bookings_by_status: BTreeMap<String, i64>,
    pub gross_volume_cents: i64,
    pub platform_fees_cents: i64,
    pub open_disputes: i64,
}

/// Fill every booking status with zero, then overlay the counted rows
pub fn status_counts(rows: Vec<(BookingStatus, i64)>) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = BookingStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for (status, count) in rows {
        counts.insert(status.as_str().to_string(), count);
    }
    counts
}
