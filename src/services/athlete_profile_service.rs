use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::validation::{normalize_sports, validate_name, validate_sports};
use crate::models::{AthleteProfile, CreateSubAccount, SubAccount, UpdateSubAccount, UpsertAthleteProfile};

const ATHLETE_COLUMNS: &str =
    "id, user_id, sports, city, state, budget_cents, skill_level, goals, created_at, updated_at";
const SUB_ACCOUNT_COLUMNS: &str =
    "id, parent_user_id, first_name, last_name, date_of_birth, relationship, sports, created_at, updated_at";

#[derive(Clone)]
pub struct AthleteProfileService {
    db: PgPool,
}

impl AthleteProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<AthleteProfile>, ServiceError> {
        let profile = sqlx::query_as::<_, AthleteProfile>(&format!(
            "SELECT {ATHLETE_COLUMNS} FROM athlete_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    pub async fn upsert(&self, user_id: Uuid, request: UpsertAthleteProfile) -> Result<AthleteProfile, ServiceError> {
        validate_sports(&request.sports).map_err(ServiceError::from_validation)?;
        if matches!(request.budget_cents, Some(budget) if budget <= 0) {
            return Err(ServiceError::validation("budget_cents must be positive"));
        }

        let profile = sqlx::query_as::<_, AthleteProfile>(&format!(
            "INSERT INTO athlete_profiles (user_id, sports, city, state, budget_cents, skill_level, goals)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (user_id) DO UPDATE SET
                sports = EXCLUDED.sports,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                budget_cents = EXCLUDED.budget_cents,
                skill_level = EXCLUDED.skill_level,
                goals = EXCLUDED.goals,
                updated_at = NOW()
             RETURNING {ATHLETE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(normalize_sports(&request.sports))
        .bind(request.city.map(|c| c.trim().to_string()))
        .bind(request.state.map(|s| s.trim().to_string()))
        .bind(request.budget_cents)
        .bind(request.skill_level)
        .bind(request.goals)
        .fetch_one(&self.db)
        .await?;

        Ok(profile)
    }

    // Sub-accounts

    pub async fn list_sub_accounts(&self, parent_user_id: Uuid) -> Result<Vec<SubAccount>, ServiceError> {
        let accounts = sqlx::query_as::<_, SubAccount>(&format!(
            "SELECT {SUB_ACCOUNT_COLUMNS} FROM sub_accounts WHERE parent_user_id = $1 ORDER BY created_at"
        ))
        .bind(parent_user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(accounts)
    }

    pub async fn create_sub_account(
        &self,
        parent_user_id: Uuid,
        request: CreateSubAccount,
    ) -> Result<SubAccount, ServiceError> {
        validate_name(&request.first_name, "first_name").map_err(ServiceError::from_validation)?;
        validate_name(&request.last_name, "last_name").map_err(ServiceError::from_validation)?;
        validate_name(&request.relationship, "relationship").map_err(ServiceError::from_validation)?;
        validate_sports(&request.sports).map_err(ServiceError::from_validation)?;
        if request.date_of_birth > Utc::now().date_naive() {
            return Err(ServiceError::validation("Date of birth cannot be in the future"));
        }

        let account = sqlx::query_as::<_, SubAccount>(&format!(
            "INSERT INTO sub_accounts (parent_user_id, first_name, last_name, date_of_birth, relationship, sports)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SUB_ACCOUNT_COLUMNS}"
        ))
        .bind(parent_user_id)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.date_of_birth)
        .bind(request.relationship.trim())
        .bind(normalize_sports(&request.sports))
        .fetch_one(&self.db)
        .await?;

        Ok(account)
    }

    pub async fn update_sub_account(
        &self,
        parent_user_id: Uuid,
        sub_account_id: Uuid,
        request: UpdateSubAccount,
    ) -> Result<SubAccount, ServiceError> {
        if let Some(name) = &request.first_name {
            validate_name(name, "first_name").map_err(ServiceError::from_validation)?;
        }
        if let Some(name) = &request.last_name {
            validate_name(name, "last_name").map_err(ServiceError::from_validation)?;
        }
        if let Some(sports) = &request.sports {
            validate_sports(sports).map_err(ServiceError::from_validation)?;
        }
        if matches!(request.date_of_birth, Some(dob) if dob > Utc::now().date_naive()) {
            return Err(ServiceError::validation("Date of birth cannot be in the future"));
        }

        sqlx::query_as::<_, SubAccount>(&format!(
            "UPDATE sub_accounts SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                date_of_birth = COALESCE($5, date_of_birth),
                relationship = COALESCE($6, relationship),
                sports = COALESCE($7, sports),
                updated_at = NOW()
             WHERE id = $1 AND parent_user_id = $2
             RETURNING {SUB_ACCOUNT_COLUMNS}"
        ))
        .bind(sub_account_id)
        .bind(parent_user_id)
        .bind(request.first_name.map(|n| n.trim().to_string()))
        .bind(request.last_name.map(|n| n.trim().to_string()))
        .bind(request.date_of_birth)
        .bind(request.relationship.map(|r| r.trim().to_string()))
        .bind(request.sports.map(|s| normalize_sports(&s)))
        .fetch_optional(&self.db)
        .await?
        .ok_or(ServiceError::NotFound("Sub-account"))
    }

    pub async fn delete_sub_account(&self, parent_user_id: Uuid, sub_account_id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM sub_accounts WHERE id = $1 AND parent_user_id = $2")
            .bind(sub_account_id)
            .bind(parent_user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Sub-account"));
        }
        Ok(())
    }
}
