use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A recurring weekly window in which a trainer accepts bookings.
/// `day_of_week` counts from Sunday = 0 to Saturday = 6.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAvailabilitySlot {
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilitySlot {
    pub day_of_week: Option<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: Option<bool>,
}

pub fn day_of_week(at: DateTime<Utc>) -> i16 {
    at.weekday().num_days_from_sunday() as i16
}

impl AvailabilitySlot {
    /// Inclusive on both slot boundaries
    pub fn covers(&self, start: NaiveTime, end: NaiveTime) -> bool {
        slot_covers(self.start_time, self.end_time, start, end)
    }
}

pub fn slot_covers(slot_start: NaiveTime, slot_end: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    start >= slot_start && end <= slot_end
}

/// Two windows on the same day overlap when they share more than a boundary instant
pub fn windows_overlap(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Find an active slot that contains `[starts_at, ends_at]` on the same UTC day.
/// Sessions that run past midnight are never covered.
pub fn find_covering_slot(
    slots: &[AvailabilitySlot],
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Option<&AvailabilitySlot> {
    if starts_at.date_naive() != ends_at.date_naive() || ends_at <= starts_at {
        return None;
    }
    let day = day_of_week(starts_at);
    let (start, end) = (starts_at.time(), ends_at.time());

    slots
        .iter()
        .find(|slot| slot.is_active && slot.day_of_week == day && slot.covers(start, end))
}

pub fn validate_slot_window(day_of_week: i16, start: NaiveTime, end: NaiveTime) -> anyhow::Result<()> {
    if !(0..=6).contains(&day_of_week) {
        anyhow::bail!("day_of_week must be between 0 (Sunday) and 6 (Saturday)");
    }
    if start >= end {
        anyhow::bail!("start_time must be before end_time");
    }
    Ok(())
}
