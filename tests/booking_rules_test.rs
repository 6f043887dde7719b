use airtrainr::models::validation::{age_on, validate_adult_age};
use airtrainr::models::{slot_covers, BookingActor, BookingStatus, PriceBreakdown, TimeRange};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn minute_of_day(minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap()
}

proptest! {
    #[test]
    fn disjoint_intervals_never_conflict(start in 0i64..10_000, len_a in 30i32..=240, gap in 0i64..600, len_b in 30i32..=240) {
        let base = Utc.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap();
        let a = TimeRange::from_duration(base + Duration::minutes(start), len_a);
        let b = TimeRange::from_duration(a.end + Duration::minutes(gap), len_b);

        prop_assert!(!a.overlaps(&b));
        prop_assert!(!b.overlaps(&a));
    }

    #[test]
    fn intersecting_intervals_always_conflict(start in 0i64..10_000, len_a in 30i32..=240, offset in 0i64..240, len_b in 30i32..=240) {
        prop_assume!(offset < len_a as i64);
        let base = Utc.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap();
        let a = TimeRange::from_duration(base + Duration::minutes(start), len_a);
        let b = TimeRange::from_duration(a.start + Duration::minutes(offset), len_b);

        prop_assert!(a.overlaps(&b));
        prop_assert!(b.overlaps(&a));
    }

    #[test]
    fn containment_is_inclusive(slot_start in 0u32..1200, slot_len in 1u32..200, inner_start in 0u32..200, inner_len in 0u32..200) {
        let slot_end = slot_start + slot_len;
        let start = slot_start + inner_start.min(slot_len);
        let end = (start + inner_len).min(slot_end);

        prop_assert!(slot_covers(minute_of_day(slot_start), minute_of_day(slot_end), minute_of_day(start), minute_of_day(end)));
        prop_assert!(slot_covers(minute_of_day(slot_start), minute_of_day(slot_end), minute_of_day(slot_start), minute_of_day(slot_end)));
    }

    #[test]
    fn fee_and_payout_add_up(rate in 1i64..=100_000, minutes in 30i32..=240, fee in 0u8..=100) {
        let breakdown = PriceBreakdown::compute(rate, minutes, fee);
        prop_assert_eq!(breakdown.platform_fee_cents + breakdown.trainer_payout_cents, breakdown.price_cents);
        prop_assert!(breakdown.platform_fee_cents >= 0);
        prop_assert!(breakdown.trainer_payout_cents >= 0);
    }

    #[test]
    fn adult_age_matches_birthday_arithmetic(days_old in 0i64..40_000) {
        let today = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
        let dob = today - Duration::days(days_old);
        // A 29 February birthday comes of age on 1 March in common years
        let eighteenth = NaiveDate::from_ymd_opt(dob.year() + 18, dob.month(), dob.day())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(dob.year() + 18, 3, 1).unwrap());

        prop_assert_eq!(validate_adult_age(dob, today).is_ok(), today >= eighteenth);
    }
}

#[test]
fn birthday_not_yet_reached_is_under_age() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
    let turns_eighteen_tomorrow = NaiveDate::from_ymd_opt(2006, 6, 18).unwrap();
    let turned_eighteen_today = NaiveDate::from_ymd_opt(2006, 6, 17).unwrap();

    assert_eq!(age_on(turns_eighteen_tomorrow, today), 17);
    assert!(validate_adult_age(turns_eighteen_tomorrow, today).is_err());
    assert!(validate_adult_age(turned_eighteen_today, today).is_ok());
}

#[test]
fn only_admins_settle_disputes() {
    for actor in [BookingActor::Athlete, BookingActor::Trainer] {
        assert!(!BookingStatus::Disputed.can_transition_to(BookingStatus::Completed, actor));
        assert!(!BookingStatus::Disputed.can_transition_to(BookingStatus::Cancelled, actor));
    }
    assert!(BookingStatus::Disputed.can_transition_to(BookingStatus::Cancelled, BookingActor::Admin));
}
