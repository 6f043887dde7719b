use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>, // Additional structured data
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingConfirmed,
    BookingRejected,
    BookingCancelled,
    BookingCompleted,
    BookingNoShow,
    BookingExpired,
    PaymentReceived,
    ReviewReceived,
    DisputeOpened,
    DisputeResolved,
    NewMessage,
    AccountStatusChanged,
    TrainerVerified,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingRequested => "booking_requested",
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingRejected => "booking_rejected",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::BookingCompleted => "booking_completed",
            NotificationKind::BookingNoShow => "booking_no_show",
            NotificationKind::BookingExpired => "booking_expired",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::ReviewReceived => "review_received",
            NotificationKind::DisputeOpened => "dispute_opened",
            NotificationKind::DisputeResolved => "dispute_resolved",
            NotificationKind::NewMessage => "new_message",
            NotificationKind::AccountStatusChanged => "account_status_changed",
            NotificationKind::TrainerVerified => "trainer_verified",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(user_id: Uuid, kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}
