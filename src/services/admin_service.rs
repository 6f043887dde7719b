use std::collections::BTreeMap;

use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::UserRole;
use crate::errors::ServiceError;
use crate::models::{
    page_limit, page_offset, status_counts, AdminStats, AdminUserQuery, BookingStatus, NewNotification,
    NotificationKind, UserSummary,
};
use crate::services::notification_service::push_notification;

const SUMMARY_COLUMNS: &str = "id, email, role, first_name, last_name, is_active, created_at";

/// Back-office queries and account moderation
#[derive(Clone)]
pub struct AdminService {
    db: PgPool,
}

impl AdminService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn stats(&self) -> Result<AdminStats, ServiceError> {
        let role_rows = sqlx::query_as::<_, (UserRole, i64)>("SELECT role, COUNT(*) FROM users GROUP BY role")
            .fetch_all(&self.db)
            .await?;
        let mut users_by_role: BTreeMap<String, i64> = [UserRole::Athlete, UserRole::Trainer, UserRole::Admin]
            .iter()
            .map(|role| (role.as_str().to_string(), 0))
            .collect();
        for (role, count) in role_rows {
            users_by_role.insert(role.as_str().to_string(), count);
        }

        let (active_trainers, verified_trainers) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*) FILTER (WHERE is_active), COUNT(*) FILTER (WHERE is_verified)
             FROM trainer_profiles",
        )
        .fetch_one(&self.db)
        .await?;

        let status_rows = sqlx::query_as::<_, (BookingStatus, i64)>(
            "SELECT status, COUNT(*) FROM bookings GROUP BY status",
        )
        .fetch_all(&self.db)
        .await?;

        let (gross_volume_cents, platform_fees_cents) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COALESCE(SUM(price_cents), 0)::BIGINT, COALESCE(SUM(platform_fee_cents), 0)::BIGINT
             FROM bookings WHERE payment_status = 'paid'",
        )
        .fetch_one(&self.db)
        .await?;

        let open_disputes: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM disputes WHERE status IN ('open', 'under_review')")
                .fetch_one(&self.db)
                .await?;

        Ok(AdminStats {
            users_by_role,
            active_trainers,
            verified_trainers,
            bookings_by_status: status_counts(status_rows),
            gross_volume_cents,
            platform_fees_cents,
            open_disputes,
        })
    }

    pub async fn list_users(&self, query: &AdminUserQuery) -> Result<Vec<UserSummary>, ServiceError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM users WHERE TRUE"));

        if let Some(role) = query.role {
            builder.push(" AND role = ").push_bind(role);
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q.to_lowercase());
            builder
                .push(" AND (lower(email) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR lower(first_name || ' ' || last_name) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page_limit(query.limit))
            .push(" OFFSET ")
            .push_bind(page_offset(query.offset));

        let users = builder.build_query_as::<UserSummary>().fetch_all(&self.db).await?;

        Ok(users)
    }

    /// Activate or deactivate an account. Deactivation revokes refresh tokens.
    pub async fn set_user_active(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<UserSummary, ServiceError> {
        if admin_id == user_id && !is_active {
            return Err(ServiceError::validation("Admins cannot deactivate their own account"));
        }

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, UserSummary>(&format!(
            "UPDATE users SET is_active = $2, updated_at = NOW()
             WHERE id = $1 RETURNING {SUMMARY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

        if !is_active {
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        push_notification(
            &mut *tx,
            NewNotification::new(
                user_id,
                NotificationKind::AccountStatusChanged,
                "Account status changed",
                if is_active {
                    "Your account has been activated."
                } else {
                    "Your account has been deactivated."
                },
            )
            .with_data(json!({ "is_active": is_active })),
        )
        .await?;

        tx.commit().await?;

        tracing::warn!(admin_id = %admin_id, user_id = %user_id, is_active, "user active flag changed");

        Ok(user)
    }
}
