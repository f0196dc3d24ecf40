//! Core types: message, change events, and the subscription predicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single direct message between two users.
///
/// The id is store-assigned and globally unique; it is the sole identity used
/// for de-duplication. The read flag only ever transitions false→true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Returns the other participant of this message relative to `user_id`.
    pub fn counterpart_of(&self, user_id: &str) -> &str {
        if self.sender_id == user_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }

    /// True if this message is addressed to `user_id` and still unread.
    pub fn unread_for(&self, user_id: &str) -> bool {
        self.receiver_id == user_id && !self.is_read
    }
}

/// Kind of row change carried by a push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
}

/// A row-change event delivered over a push channel. The message carries the
/// post-change state of the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub kind: EventKind,
    pub message: Message,
}

/// Predicate for push subscriptions.
///
/// `Receiver` matches rows addressed to one user (optionally one event kind);
/// `Pair` matches rows exchanged between two users in either direction, which
/// is what an open thread listens on so the sender's own echoed creation
/// events arrive alongside the counterpart's messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventFilter {
    Receiver {
        receiver_id: String,
        kind: Option<EventKind>,
    },
    Pair {
        user_a: String,
        user_b: String,
    },
}

impl EventFilter {
    /// Filter for all events addressed to `receiver_id`.
    pub fn receiver(receiver_id: impl Into<String>) -> Self {
        Self::Receiver {
            receiver_id: receiver_id.into(),
            kind: None,
        }
    }

    /// Filter for one event kind addressed to `receiver_id`.
    pub fn receiver_kind(receiver_id: impl Into<String>, kind: EventKind) -> Self {
        Self::Receiver {
            receiver_id: receiver_id.into(),
            kind: Some(kind),
        }
    }

    /// Filter for all events exchanged between two users, either direction.
    pub fn pair(user_a: impl Into<String>, user_b: impl Into<String>) -> Self {
        Self::Pair {
            user_a: user_a.into(),
            user_b: user_b.into(),
        }
    }

    /// Whether `event` passes this predicate.
    pub fn matches(&self, event: &MessageEvent) -> bool {
        match self {
            Self::Receiver { receiver_id, kind } => {
                event.message.receiver_id == *receiver_id
                    && kind.map_or(true, |k| k == event.kind)
            }
            Self::Pair { user_a, user_b } => {
                (event.message.sender_id == *user_a && event.message.receiver_id == *user_b)
                    || (event.message.sender_id == *user_b && event.message.receiver_id == *user_a)
            }
        }
    }
}
