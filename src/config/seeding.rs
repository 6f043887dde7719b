use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthService, RegisterRequest, UserRole};
use crate::models::{CreateAvailabilitySlot, UpsertAthleteProfile, UpsertTrainerProfile};
use crate::services::{AthleteProfileService, AvailabilityService, TrainerProfileService};

const DEMO_PASSWORD: &str = "Demo-Trainr-2024!";

struct DemoTrainer {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    sports: &'static [&'static str],
    city: &'static str,
    state: &'static str,
    hourly_rate_cents: i64,
    years_experience: i32,
}

const DEMO_TRAINERS: &[DemoTrainer] = &[
    DemoTrainer {
        email: "coach.rivera@example.com",
        first_name: "Dana",
        last_name: "Rivera",
        sports: &["tennis", "pickleball"],
        city: "Austin",
        state: "TX",
        hourly_rate_cents: 7500,
        years_experience: 8,
    },
    DemoTrainer {
        email: "coach.okafor@example.com",
        first_name: "Sam",
        last_name: "Okafor",
        sports: &["basketball"],
        city: "Dallas",
        state: "TX",
        hourly_rate_cents: 11000,
        years_experience: 3,
    },
];

/// Loads a small demo marketplace when `SEED_DEMO_DATA` is set. Safe to run repeatedly.
pub struct DatabaseSeeder {
    pool: PgPool,
    auth_service: AuthService,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool, jwt_secret: &str) -> Self {
        Self {
            auth_service: AuthService::new(pool.clone(), jwt_secret),
            pool,
        }
    }

    pub async fn seed_all(&self) -> Result<()> {
        tracing::info!("Starting database seeding...");

        self.seed_trainers().await?;
        self.seed_athlete().await?;

        tracing::info!("Database seeding completed!");
        Ok(())
    }

    async fn seed_trainers(&self) -> Result<()> {
        let profiles = TrainerProfileService::new(self.pool.clone());
        let availability = AvailabilityService::new(self.pool.clone());

        for demo in DEMO_TRAINERS {
            if self.user_id_by_email(demo.email).await?.is_some() {
                continue;
            }

            let user_id = self
                .register(demo.email, demo.first_name, demo.last_name, UserRole::Trainer)
                .await?;

            let profile = profiles
                .upsert(
                    user_id,
                    UpsertTrainerProfile {
                        bio: Some(format!("{} coach based in {}.", demo.sports.join(" and "), demo.city)),
                        sports: demo.sports.iter().map(|s| s.to_string()).collect(),
                        city: Some(demo.city.to_string()),
                        state: Some(demo.state.to_string()),
                        hourly_rate_cents: demo.hourly_rate_cents,
                        years_experience: demo.years_experience,
                        certifications: Vec::new(),
                        is_active: Some(true),
                    },
                )
                .await?;

            // Weekday mornings
            for day_of_week in 1..=5 {
                availability
                    .create(
                        profile.id,
                        CreateAvailabilitySlot {
                            day_of_week,
                            start_time: time(8),
                            end_time: time(12),
                        },
                    )
                    .await?;
            }

            tracing::info!(trainer_id = %profile.id, "Created demo trainer");
        }

        Ok(())
    }

    async fn seed_athlete(&self) -> Result<()> {
        const EMAIL: &str = "athlete.demo@example.com";
        if self.user_id_by_email(EMAIL).await?.is_some() {
            return Ok(());
        }

        let user_id = self.register(EMAIL, "Alex", "Morgan", UserRole::Athlete).await?;

        AthleteProfileService::new(self.pool.clone())
            .upsert(
                user_id,
                UpsertAthleteProfile {
                    sports: vec!["tennis".to_string()],
                    city: Some("Austin".to_string()),
                    state: Some("TX".to_string()),
                    budget_cents: Some(8000),
                    skill_level: Some("intermediate".to_string()),
                    goals: Some("Tournament-ready serve".to_string()),
                },
            )
            .await?;

        tracing::info!("Created demo athlete");
        Ok(())
    }

    async fn register(&self, email: &str, first_name: &str, last_name: &str, role: UserRole) -> Result<Uuid> {
        let response = self
            .auth_service
            .register(RegisterRequest {
                email: email.to_string(),
                password: DEMO_PASSWORD.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap_or_default(),
                phone: None,
                role: Some(role),
            })
            .await?;
        Ok(response.user.id)
    }

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
}
