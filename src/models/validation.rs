use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

pub const ADULT_AGE: i32 = 18;
pub const MAX_MESSAGE_LENGTH: usize = 5000;
pub const MAX_REVIEW_COMMENT_LENGTH: usize = 2000;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern compiles")
    })
}

/// Email validation
pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(anyhow!("Email cannot be empty"));
    }

    if email.len() > 255 {
        return Err(anyhow!("Email cannot be longer than 255 characters"));
    }

    if !email_pattern().is_match(email) {
        return Err(anyhow!("Invalid email format"));
    }

    Ok(())
}

pub fn validate_name(name: &str, field_name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    if trimmed.chars().count() > 100 {
        return Err(anyhow!("{} cannot be longer than 100 characters", field_name));
    }
    Ok(())
}

/// Whole years between `date_of_birth` and `today`; the birthday counts only once reached.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

pub fn validate_adult_age(date_of_birth: NaiveDate, today: NaiveDate) -> Result<()> {
    if date_of_birth > today {
        return Err(anyhow!("Date of birth cannot be in the future"));
    }
    if age_on(date_of_birth, today) < ADULT_AGE {
        return Err(anyhow!("You must be at least {} years old", ADULT_AGE));
    }
    Ok(())
}

/// Sports are free text but must be non-empty and reasonably short
pub fn validate_sports(sports: &[String]) -> Result<()> {
    if sports.len() > 20 {
        return Err(anyhow!("At most 20 sports may be listed"));
    }
    for sport in sports {
        let trimmed = sport.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Sport names cannot be empty"));
        }
        if trimmed.len() > 100 {
            return Err(anyhow!("Sport names cannot be longer than 100 characters"));
        }
    }
    Ok(())
}

/// Trimmed, Unicode case-insensitive equality, matching Postgres `lower()`
pub fn eq_folded(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Trim, drop empties and case-insensitive duplicates while keeping first-seen order
pub fn normalize_sports(sports: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    sports
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

pub fn validate_rating(rating: i16) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(anyhow!("Rating must be between 1 and 5"));
    }
    Ok(())
}

pub fn validate_hourly_rate(cents: i64) -> Result<()> {
    if cents <= 0 {
        return Err(anyhow!("Hourly rate must be positive"));
    }
    if cents > 100_000 {
        return Err(anyhow!("Hourly rate cannot exceed 1000.00"));
    }
    Ok(())
}

pub fn validate_text(text: &str, field_name: &str, max_len: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    if text.chars().count() > max_len {
        return Err(anyhow!("{} cannot be longer than {} characters", field_name, max_len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("test@").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_age_counts_birthday_only_once_reached() {
        let today = date(2024, 6, 15);
        assert_eq!(age_on(date(2006, 6, 15), today), 18);
        assert_eq!(age_on(date(2006, 6, 16), today), 17);
        assert_eq!(age_on(date(2006, 7, 1), today), 17);
        assert_eq!(age_on(date(2006, 5, 31), today), 18);
    }

    #[test]
    fn test_adult_age_validation() {
        let today = date(2024, 6, 15);
        assert!(validate_adult_age(date(2006, 6, 15), today).is_ok());
        assert!(validate_adult_age(date(2006, 6, 16), today).is_err());
        assert!(validate_adult_age(date(1980, 1, 1), today).is_ok());
        assert!(validate_adult_age(date(2030, 1, 1), today).is_err());
    }

    #[test]
    fn test_leap_day_birthday() {
        // Born on Feb 29: the birthday has not been reached on Feb 28 of a common year
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 2, 28)), 17);
        assert_eq!(age_on(date(2004, 2, 29), date(2022, 3, 1)), 18);
    }

    #[test]
    fn test_normalize_sports() {
        let sports = vec![
            " Tennis ".to_string(),
            "tennis".to_string(),
            "".to_string(),
            "Golf".to_string(),
        ];
        assert_eq!(normalize_sports(&sports), vec!["Tennis".to_string(), "Golf".to_string()]);
    }

    #[test]
    fn test_rating_validation() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_hourly_rate_validation() {
        assert!(validate_hourly_rate(6500).is_ok());
        assert!(validate_hourly_rate(0).is_err());
        assert!(validate_hourly_rate(200_000).is_err());
    }
}
