//! Trainer match scoring and search.
//!
//! The score is a flat additive heuristic in `[50, 100]`: every trainer starts at
//! [`BASE_SCORE`] and collects fixed bonuses. It is recomputed per request and
//! never stored.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::validation::eq_folded;
use crate::models::{
    page_limit, page_offset, AthleteProfile, ScoredTrainer, TrainerListing, TrainerSearchQuery,
};

pub const BASE_SCORE: u32 = 50;
pub const MAX_SCORE: u32 = 100;
pub const SPORT_BONUS: u32 = 30;
pub const CITY_BONUS: u32 = 15;
pub const STATE_BONUS: u32 = 8;
pub const VERIFIED_BONUS: u32 = 10;
pub const EXPERIENCE_BONUS: u32 = 5;
pub const EXPERIENCED_YEARS: i32 = 5;

/// What scoring needs to know about the searching athlete
#[derive(Debug, Clone, Default)]
pub struct AthletePreferences {
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub budget_cents: Option<i64>,
}

impl From<&AthleteProfile> for AthletePreferences {
    fn from(profile: &AthleteProfile) -> Self {
        Self {
            sports: profile.sports.clone(),
            city: profile.city.clone(),
            state: profile.state.clone(),
            budget_cents: profile.budget_cents,
        }
    }
}

/// What scoring needs to know about one trainer
#[derive(Debug, Clone)]
pub struct TrainerCandidate<'a> {
    pub sports: &'a [String],
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub hourly_rate_cents: i64,
    pub is_verified: bool,
    pub years_experience: i32,
    pub average_rating: f64,
}

impl<'a> From<&'a TrainerListing> for TrainerCandidate<'a> {
    fn from(listing: &'a TrainerListing) -> Self {
        Self {
            sports: &listing.sports,
            city: listing.city.as_deref(),
            state: listing.state.as_deref(),
            hourly_rate_cents: listing.hourly_rate_cents,
            is_verified: listing.is_verified,
            years_experience: listing.years_experience,
            average_rating: listing.average_rating,
        }
    }
}

fn same_place(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.map(str::trim), b.map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() => eq_folded(a, b),
        _ => false,
    }
}

fn sports_intersect(a: &[String], b: &[String]) -> bool {
    a.iter().any(|x| b.iter().any(|y| eq_folded(x, y)))
}

fn price_bonus(hourly_rate_cents: i64) -> u32 {
    match hourly_rate_cents {
        c if c <= 8_000 => 10,
        c if c <= 12_000 => 5,
        _ => 0,
    }
}

fn rating_bonus(average_rating: f64) -> u32 {
    if average_rating >= 4.5 {
        10
    } else if average_rating >= 4.0 {
        5
    } else {
        0
    }
}

/// Score one trainer for one athlete.
///
/// Without athlete preferences the sport and location bonuses cannot apply;
/// the trainer-only bonuses (price band, verification, experience, rating) still do.
pub fn match_score(athlete: Option<&AthletePreferences>, trainer: &TrainerCandidate<'_>) -> u8 {
    let mut score = BASE_SCORE;

    if let Some(athlete) = athlete {
        if sports_intersect(&athlete.sports, trainer.sports) {
            score += SPORT_BONUS;
        }

        if same_place(athlete.city.as_deref(), trainer.city) {
            score += CITY_BONUS;
        } else if same_place(athlete.state.as_deref(), trainer.state) {
            score += STATE_BONUS;
        }
    }

    score += price_bonus(trainer.hourly_rate_cents);

    if trainer.is_verified {
        score += VERIFIED_BONUS;
    }

    if trainer.years_experience >= EXPERIENCED_YEARS {
        score += EXPERIENCE_BONUS;
    }

    score += rating_bonus(trainer.average_rating);

    score.min(MAX_SCORE) as u8
}

/// Score and sort listings, best first. Equal scores keep their incoming order.
pub fn rank_trainers(athlete: Option<&AthletePreferences>, trainers: Vec<TrainerListing>) -> Vec<ScoredTrainer> {
    let mut scored: Vec<ScoredTrainer> = trainers
        .into_iter()
        .map(|trainer| {
            let match_score = match_score(athlete, &TrainerCandidate::from(&trainer));
            ScoredTrainer { trainer, match_score }
        })
        .collect();

    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored
}

/// Slice one page out of an already ranked list
pub fn ranked_page(ranked: Vec<ScoredTrainer>, limit: Option<i64>, offset: Option<i64>) -> Vec<ScoredTrainer> {
    let limit = usize::try_from(page_limit(limit)).unwrap_or(usize::MAX);
    let offset = usize::try_from(page_offset(offset)).unwrap_or(usize::MAX);
    ranked.into_iter().skip(offset).take(limit).collect()
}

pub(crate) const LISTING_SELECT: &str = "SELECT t.id, t.user_id, u.first_name, u.last_name, t.bio, t.sports, t.city, t.state, \
     t.hourly_rate_cents, t.years_experience, t.certifications, t.is_verified, \
     COALESCE(r.average_rating, 0)::float8 AS average_rating, \
     COALESCE(r.review_count, 0) AS review_count \
     FROM trainer_profiles t \
     JOIN users u ON u.id = t.user_id \
     LEFT JOIN (SELECT trainer_id, AVG(rating)::float8 AS average_rating, COUNT(*) AS review_count \
                FROM reviews GROUP BY trainer_id) r ON r.trainer_id = t.id";

#[derive(Clone)]
pub struct MatchingService {
    db: PgPool,
}

impl MatchingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Filter active trainers, then rank them for `athlete_user_id` when given
    #[tracing::instrument(skip(self, query))]
    pub async fn search(
        &self,
        athlete_user_id: Option<Uuid>,
        query: &TrainerSearchQuery,
    ) -> Result<Vec<ScoredTrainer>, ServiceError> {
        let preferences = match athlete_user_id {
            Some(user_id) => self.athlete_preferences(user_id).await?,
            None => None,
        };

        let trainers = self.fetch_candidates(query).await?;
        let candidates = trainers.len();
        let ranked = rank_trainers(preferences.as_ref(), trainers);
        let page = ranked_page(ranked, query.limit, query.offset);

        tracing::debug!(candidates, results = page.len(), personalized = preferences.is_some(), "trainer search ranked");

        Ok(page)
    }

    async fn athlete_preferences(&self, user_id: Uuid) -> Result<Option<AthletePreferences>, ServiceError> {
        let profile = sqlx::query_as::<_, AthleteProfile>(
            "SELECT id, user_id, sports, city, state, budget_cents, skill_level, goals, created_at, updated_at
             FROM athlete_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile.as_ref().map(AthletePreferences::from))
    }

    async fn fetch_candidates(&self, query: &TrainerSearchQuery) -> Result<Vec<TrainerListing>, ServiceError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(LISTING_SELECT);
        builder.push(" WHERE t.is_active AND u.is_active");

        if let Some(sport) = query.sport.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder
                .push(" AND EXISTS (SELECT 1 FROM unnest(t.sports) s WHERE lower(s) = lower(")
                .push_bind(sport.to_string())
                .push("))");
        }
        if let Some(city) = query.city.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder.push(" AND lower(t.city) = lower(").push_bind(city.to_string()).push(")");
        }
        if let Some(state) = query.state.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder.push(" AND lower(t.state) = lower(").push_bind(state.to_string()).push(")");
        }
        if let Some(max_rate) = query.max_rate_cents {
            builder.push(" AND t.hourly_rate_cents <= ").push_bind(max_rate);
        }
        if let Some(min_rating) = query.min_rating {
            builder
                .push(" AND COALESCE(r.average_rating, 0) >= ")
                .push_bind(min_rating);
        }
        if query.verified_only {
            builder.push(" AND t.is_verified");
        }
        if let Some(text) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", text.to_lowercase());
            builder
                .push(" AND (lower(u.first_name || ' ' || u.last_name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR lower(t.bio) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        // Pagination happens after ranking, so every filtered candidate is scored
        builder.push(" ORDER BY t.created_at ASC");

        let trainers = builder.build_query_as::<TrainerListing>().fetch_all(&self.db).await?;
        Ok(trainers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn listing(name: &str, sports: &[&str], city: &str, state: &str, rate: i64) -> TrainerListing {
        TrainerListing {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            first_name: name.to_string(),
            last_name: "Trainer".to_string(),
            bio: String::new(),
            sports: sports.iter().map(|s| s.to_string()).collect(),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            hourly_rate_cents: rate,
            years_experience: 0,
            certifications: vec![],
            is_verified: false,
            average_rating: 0.0,
            review_count: 0,
        }
    }

    fn athlete(sports: &[&str], city: &str, state: &str) -> AthletePreferences {
        AthletePreferences {
            sports: sports.iter().map(|s| s.to_string()).collect(),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            budget_cents: None,
        }
    }

    #[test]
    fn test_base_score_for_expensive_unknown_trainer() {
        let trainer = listing("Ana", &["golf"], "Austin", "TX", 20_000);
        assert_eq!(match_score(None, &TrainerCandidate::from(&trainer)), 50);
    }

    #[test]
    fn test_city_beats_state() {
        let prefs = athlete(&["tennis"], "austin", "tx");
        let same_city = listing("A", &["golf"], "Austin", "TX", 20_000);
        let same_state = listing("B", &["golf"], "Dallas", "TX", 20_000);

        assert_eq!(match_score(Some(&prefs), &TrainerCandidate::from(&same_city)), 65);
        assert_eq!(match_score(Some(&prefs), &TrainerCandidate::from(&same_state)), 58);
    }

    #[test]
    fn test_non_ascii_sport_and_city_match() {
        let prefs = athlete(&["über-fitness"], "münchen", "BY");
        let trainer = listing("Jo", &["Über-Fitness"], "MÜNCHEN", "BY", 20_000);

        // 50 + 30 (sport) + 15 (city)
        assert_eq!(match_score(Some(&prefs), &TrainerCandidate::from(&trainer)), 95);
    }

    #[test]
    fn test_price_bands() {
        assert_eq!(price_bonus(8_000), 10);
        assert_eq!(price_bonus(8_001), 5);
        assert_eq!(price_bonus(12_000), 5);
        assert_eq!(price_bonus(12_001), 0);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(rating_bonus(4.5), 10);
        assert_eq!(rating_bonus(4.49), 5);
        assert_eq!(rating_bonus(4.0), 5);
        assert_eq!(rating_bonus(3.99), 0);
    }

    #[test]
    fn test_score_is_clamped() {
        let prefs = athlete(&["tennis"], "Austin", "TX");
        let mut star = listing("Star", &["Tennis"], "Austin", "TX", 5_000);
        star.is_verified = true;
        star.years_experience = 12;
        star.average_rating = 4.9;

        assert_eq!(match_score(Some(&prefs), &TrainerCandidate::from(&star)), 100);
    }

    #[test]
    fn test_missing_athlete_profile_keeps_trainer_bonuses() {
        let mut trainer = listing("Vet", &["tennis"], "Austin", "TX", 7_000);
        trainer.is_verified = true;
        // 50 + 10 (price) + 10 (verified)
        assert_eq!(match_score(None, &TrainerCandidate::from(&trainer)), 70);
    }

    #[test]
    fn test_ranking_is_descending_and_stable() {
        let prefs = athlete(&["tennis"], "Austin", "TX");
        let first = listing("First", &["golf"], "Reno", "NV", 20_000);
        let second = listing("Second", &["golf"], "Reno", "NV", 20_000);
        let best = listing("Best", &["tennis"], "Austin", "TX", 20_000);

        let ranked = rank_trainers(Some(&prefs), vec![first, second, best]);
        let names: Vec<&str> = ranked.iter().map(|s| s.trainer.first_name.as_str()).collect();

        assert_eq!(names, vec!["Best", "First", "Second"]);
        assert_eq!(ranked[0].match_score, 95);
        assert_eq!(ranked[1].match_score, 50);
    }

    #[test]
    fn test_first_page_holds_best_match_even_when_newest() {
        let prefs = athlete(&["tennis"], "Austin", "TX");
        // Candidates arrive oldest first; the strongest match is the newest profile
        let oldest = listing("Oldest", &["golf"], "Dallas", "TX", 20_000);
        let mut newest = listing("Newest", &["tennis"], "Austin", "TX", 5_000);
        newest.is_verified = true;

        let ranked = rank_trainers(Some(&prefs), vec![oldest, newest]);

        let first_page = ranked_page(ranked.clone(), Some(1), None);
        assert_eq!(first_page.len(), 1);
        assert_eq!(first_page[0].trainer.first_name, "Newest");
        assert_eq!(first_page[0].match_score, 100);

        let second_page = ranked_page(ranked, Some(1), Some(1));
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].trainer.first_name, "Oldest");
        assert_eq!(second_page[0].match_score, 58);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let ranked = rank_trainers(None, vec![listing("Solo", &["golf"], "Reno", "NV", 20_000)]);
        assert!(ranked_page(ranked, Some(10), Some(5)).is_empty());
    }
}
