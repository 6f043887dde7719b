use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{
    page_limit, page_offset, NewNotification, Notification, NotificationListResponse, NotificationQuery,
};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, data, read_at, created_at";

/// Insert a notification using any executor, so callers can write it
/// inside the same transaction as the change it reports.
pub async fn push_notification<'e, E>(executor: E, notification: NewNotification) -> Result<Notification, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let created = sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications (user_id, kind, title, message, data)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(notification.user_id)
    .bind(notification.kind.as_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.data)
    .fetch_one(executor)
    .await?;

    tracing::debug!(
        user_id = %created.user_id,
        kind = %created.kind,
        "notification created"
    );

    Ok(created)
}

#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn notify(&self, notification: NewNotification) -> Result<Notification, ServiceError> {
        Ok(push_notification(&self.db, notification).await?)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &NotificationQuery,
    ) -> Result<NotificationListResponse, ServiceError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = $1 AND ($2 = FALSE OR read_at IS NULL)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(query.unread_only)
        .bind(page_limit(query.limit))
        .bind(page_offset(query.offset))
        .fetch_all(&self.db)
        .await?;

        let unread_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(NotificationListResponse {
            notifications,
            unread_count,
        })
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification, ServiceError> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ServiceError::NotFound("Notification"))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = sqlx::query("UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
