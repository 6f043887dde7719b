use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ConversationSummary {
    pub counterpart_id: Uuid,
    pub counterpart_first_name: String,
    pub counterpart_last_name: String,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

/// How many recent message ids a feed remembers for duplicate suppression
pub const FEED_DEDUP_WINDOW: usize = 512;

/// Per-subscriber view of the live message stream.
/// Delivers each message at most once (within the last [`FEED_DEDUP_WINDOW`]
/// ids) and only to its participants.
#[derive(Debug)]
pub struct MessageFeed {
    user_id: Uuid,
    capacity: usize,
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
}

impl MessageFeed {
    pub fn new(user_id: Uuid) -> Self {
        Self::with_capacity(user_id, FEED_DEDUP_WINDOW)
    }

    pub fn with_capacity(user_id: Uuid, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            user_id,
            capacity,
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns true when `message` should be forwarded to this subscriber
    pub fn accept(&mut self, message: &Message) -> bool {
        if !message.involves(self.user_id) || !self.seen.insert(message.id) {
            return false;
        }

        self.order.push_back(message.id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn remembered(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender_id: Uuid, recipient_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            booking_id: None,
            content: "See you at the track".to_string(),
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_feed_skips_duplicates() {
        let me = Uuid::new_v4();
        let mut feed = MessageFeed::new(me);
        let incoming = message(Uuid::new_v4(), me);

        assert!(feed.accept(&incoming));
        assert!(!feed.accept(&incoming.clone()));
    }

    #[test]
    fn test_feed_skips_foreign_conversations() {
        let mut feed = MessageFeed::new(Uuid::new_v4());
        assert!(!feed.accept(&message(Uuid::new_v4(), Uuid::new_v4())));
    }

    #[test]
    fn test_feed_includes_own_messages() {
        let me = Uuid::new_v4();
        let mut feed = MessageFeed::new(me);
        assert!(feed.accept(&message(me, Uuid::new_v4())));
    }

    #[test]
    fn test_feed_memory_is_bounded() {
        let me = Uuid::new_v4();
        let mut feed = MessageFeed::with_capacity(me, 3);
        let first = message(Uuid::new_v4(), me);
        assert!(feed.accept(&first));

        for _ in 0..10 {
            assert!(feed.accept(&message(Uuid::new_v4(), me)));
        }

        assert_eq!(feed.remembered(), 3);
        // Evicted ids are forgotten, recent ones still deduplicate
        assert!(feed.accept(&first));
        assert!(!feed.accept(&first));
    }
}
