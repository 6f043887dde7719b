//! Direct messages between users plus the in-process hub that feeds live streams.

use serde_json::json;
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::validation::{validate_text, MAX_MESSAGE_LENGTH};
use crate::models::{
    page_limit, page_offset, ConversationSummary, Message, NewNotification, NotificationKind, PaginationQuery,
    SendMessageRequest,
};
use crate::services::notification_service::push_notification;

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, booking_id, content, read_at, created_at";
const HUB_CAPACITY: usize = 256;

/// Fan-out of newly stored messages to every live subscriber.
/// Each subscriber filters for its own conversations.
#[derive(Clone)]
pub struct MessageHub {
    sender: broadcast::Sender<Message>,
}

impl MessageHub {
    pub fn new() -> Self {
        Self::with_capacity(HUB_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub fn publish(&self, message: Message) {
        // No receivers is fine: nobody is streaming right now
        let _ = self.sender.send(message);
    }
}

impl Default for MessageHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct MessageService {
    db: PgPool,
    hub: MessageHub,
}

impl MessageService {
    pub fn new(db: PgPool, hub: MessageHub) -> Self {
        Self { db, hub }
    }

    pub fn hub(&self) -> &MessageHub {
        &self.hub
    }

    #[tracing::instrument(skip(self, request), fields(recipient_id = %request.recipient_id))]
    pub async fn send(&self, sender_id: Uuid, request: SendMessageRequest) -> Result<Message, ServiceError> {
        validate_text(&request.content, "content", MAX_MESSAGE_LENGTH).map_err(ServiceError::from_validation)?;
        if request.recipient_id == sender_id {
            return Err(ServiceError::validation("You cannot message yourself"));
        }

        let mut tx = self.db.begin().await?;

        let recipient_active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
            .bind(request.recipient_id)
            .fetch_optional(&mut *tx)
            .await?;
        match recipient_active {
            None => return Err(ServiceError::NotFound("Recipient")),
            Some(false) => return Err(ServiceError::validation("Recipient account is deactivated")),
            Some(true) => {}
        }

        if let Some(booking_id) = request.booking_id {
            let linked: bool = sqlx::query_scalar(
                "SELECT EXISTS (
                    SELECT 1 FROM bookings b JOIN trainer_profiles t ON t.id = b.trainer_id
                    WHERE b.id = $1
                      AND (b.athlete_id = $2 OR t.user_id = $2)
                      AND (b.athlete_id = $3 OR t.user_id = $3)
                 )",
            )
            .bind(booking_id)
            .bind(sender_id)
            .bind(request.recipient_id)
            .fetch_one(&mut *tx)
            .await?;
            if !linked {
                return Err(ServiceError::validation("booking_id must refer to a booking between both users"));
            }
        }

        let message = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (sender_id, recipient_id, booking_id, content)
             VALUES ($1, $2, $3, $4)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(sender_id)
        .bind(request.recipient_id)
        .bind(request.booking_id)
        .bind(request.content.trim())
        .fetch_one(&mut *tx)
        .await?;

        push_notification(
            &mut *tx,
            NewNotification::new(
                message.recipient_id,
                NotificationKind::NewMessage,
                "New message",
                preview(&message.content),
            )
            .with_data(json!({ "message_id": message.id, "sender_id": sender_id })),
        )
        .await?;

        tx.commit().await?;

        self.hub.publish(message.clone());

        Ok(message)
    }

    /// Latest message and unread count per counterpart, newest conversation first
    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, ServiceError> {
        let conversations = sqlx::query_as::<_, ConversationSummary>(
            "WITH threads AS (
                SELECT
                    CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END AS counterpart_id,
                    content,
                    created_at,
                    (recipient_id = $1 AND read_at IS NULL) AS unread
                FROM messages
                WHERE sender_id = $1 OR recipient_id = $1
             ),
             latest AS (
                SELECT DISTINCT ON (counterpart_id) counterpart_id, content, created_at
                FROM threads
                ORDER BY counterpart_id, created_at DESC
             )
             SELECT
                l.counterpart_id,
                u.first_name AS counterpart_first_name,
                u.last_name AS counterpart_last_name,
                l.content AS last_message,
                l.created_at AS last_message_at,
                (SELECT COUNT(*) FROM threads th WHERE th.counterpart_id = l.counterpart_id AND th.unread) AS unread_count
             FROM latest l
             JOIN users u ON u.id = l.counterpart_id
             ORDER BY l.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(conversations)
    }

    /// Messages between two users, oldest first
    pub async fn conversation(
        &self,
        user_id: Uuid,
        counterpart_id: Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<Message>, ServiceError> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE (sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1)
             ORDER BY created_at ASC, id ASC
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(counterpart_id)
        .bind(page_limit(page.limit))
        .bind(page_offset(page.offset))
        .fetch_all(&self.db)
        .await?;

        Ok(messages)
    }

    /// Mark everything `counterpart_id` sent to `user_id` as read
    pub async fn mark_conversation_read(&self, user_id: Uuid, counterpart_id: Uuid) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = NOW()
             WHERE recipient_id = $1 AND sender_id = $2 AND read_at IS NULL",
        )
        .bind(user_id)
        .bind(counterpart_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}

fn preview(content: &str) -> String {
    const PREVIEW_CHARS: usize = 80;
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            booking_id: None,
            content: content.to_string(),
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_preview_truncates_long_messages() {
        let long = "x".repeat(200);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 83);
        assert!(short.ends_with("..."));
        assert_eq!(preview("hello"), "hello");
    }

    #[tokio::test]
    async fn test_hub_delivers_to_every_subscriber() {
        let hub = MessageHub::with_capacity(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let sent = message("warmup at 9");
        hub.publish(sent.clone());

        assert_eq!(first.recv().await.unwrap(), sent);
        assert_eq!(second.recv().await.unwrap(), sent);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let hub = MessageHub::new();
        hub.publish(message("nobody listening"));
    }
}
