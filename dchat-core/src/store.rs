//! Store abstraction for the message log.
//!
//! [`MessageStore`] is backend-agnostic; implementations live in the
//! `storage` crate (SQLite, in-memory) and fan change events out through a
//! [`crate::push::PushRouter`].

use crate::error::{MessagingError, SubscriptionError, WriteError};
use crate::push::Subscription;
use crate::types::{EventFilter, Message};
use async_trait::async_trait;

/// Abstraction over the remote message log: append, range queries, read-state
/// updates, unread counting, and push subscriptions.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a message from `sender_id` to `receiver_id`. Content must be
    /// non-empty after trimming. Returns the stored message carrying its
    /// store-assigned id and creation timestamp.
    async fn append(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<Message, WriteError>;

    /// Full interleaved history for the pair, ascending by (created_at, id).
    /// Restartable: callable repeatedly with identical results at quiescence.
    async fn fetch_range(&self, user_a: &str, user_b: &str)
        -> Result<Vec<Message>, MessagingError>;

    /// All messages where `user_id` is sender or receiver, descending by
    /// (created_at, id). Used only for inbox aggregation.
    async fn fetch_inbox_log(&self, user_id: &str) -> Result<Vec<Message>, MessagingError>;

    /// Atomically flips read=true for all currently-unread messages from
    /// `sender_id` to `receiver_id`. Messages appended after the call begins
    /// are not affected. Returns the number of rows flipped.
    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, WriteError>;

    /// Count of unread messages addressed to `receiver_id`, without
    /// materializing rows.
    async fn count_unread(&self, receiver_id: &str) -> Result<u64, MessagingError>;

    /// Opens a push subscription for events matching `filter`. Delivery is
    /// at-least-once with no ordering promise across distinct messages;
    /// closing the returned handle is the unsubscribe operation.
    async fn subscribe(&self, filter: EventFilter) -> Result<Subscription, SubscriptionError>;
}
