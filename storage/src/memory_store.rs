//! In-memory message store for testing and development.
//!
//! Behavioral twin of [`crate::SqliteMessageStore`]: same ordering, same
//! read-state transition, same event publication. Data is lost on drop, so it
//! is not suitable for production use. Write failures can be injected to
//! exercise error paths.

use async_trait::async_trait;
use chrono::Utc;
use dchat_core::{
    EventFilter, EventKind, Message, MessageEvent, MessageStore, MessagingError, PushRouter,
    Subscription, SubscriptionError, WriteError,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<Vec<Message>>>,
    router: PushRouter,
    fail_next_append: Arc<AtomicBool>,
    fail_next_mark_read: Arc<AtomicBool>,
    mark_read_calls: Arc<AtomicU64>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages in the store.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes all messages. Subscriptions stay open.
    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }

    /// Makes the next `append` fail with a simulated network error.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Makes the next `mark_read` fail with a simulated network error.
    pub fn fail_next_mark_read(&self) {
        self.fail_next_mark_read.store(true, Ordering::SeqCst);
    }

    /// Total `mark_read` calls attempted against this store (including
    /// injected failures). Used to assert debounce coalescing.
    pub fn mark_read_calls(&self) -> u64 {
        self.mark_read_calls.load(Ordering::SeqCst)
    }

    /// Re-delivers an event to subscribers, as an at-least-once transport may.
    pub async fn redeliver(&self, event: &MessageEvent) {
        self.router.publish(event).await;
    }

    /// The event router this store publishes into.
    pub fn router(&self) -> &PushRouter {
        &self.router
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<Message, WriteError> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(WriteError::Unavailable(
                "injected append failure".to_string(),
            ));
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(WriteError::EmptyContent);
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        self.messages.write().await.push(message.clone());
        debug!(message_id = %message.id, "appended message");

        self.router
            .publish(&MessageEvent {
                kind: EventKind::Created,
                message: message.clone(),
            })
            .await;

        Ok(message)
    }

    async fn fetch_range(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let messages = self.messages.read().await;
        let mut range: Vec<Message> = messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect();
        range.sort_by(|a, b| (a.created_at, a.id.as_str()).cmp(&(b.created_at, b.id.as_str())));
        Ok(range)
    }

    async fn fetch_inbox_log(&self, user_id: &str) -> Result<Vec<Message>, MessagingError> {
        let messages = self.messages.read().await;
        let mut log: Vec<Message> = messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
            .cloned()
            .collect();
        log.sort_by(|a, b| (b.created_at, b.id.as_str()).cmp(&(a.created_at, a.id.as_str())));
        Ok(log)
    }

    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, WriteError> {
        self.mark_read_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_next_mark_read.swap(false, Ordering::SeqCst) {
            return Err(WriteError::Unavailable(
                "injected mark-read failure".to_string(),
            ));
        }

        let flipped: Vec<Message> = {
            let mut messages = self.messages.write().await;
            messages
                .iter_mut()
                .filter(|m| {
                    m.sender_id == sender_id && m.receiver_id == receiver_id && !m.is_read
                })
                .map(|m| {
                    m.is_read = true;
                    m.clone()
                })
                .collect()
        };

        for message in &flipped {
            self.router
                .publish(&MessageEvent {
                    kind: EventKind::Updated,
                    message: message.clone(),
                })
                .await;
        }

        Ok(flipped.len() as u64)
    }

    async fn count_unread(&self, receiver_id: &str) -> Result<u64, MessagingError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|m| m.unread_for(receiver_id)).count() as u64)
    }

    async fn subscribe(&self, filter: EventFilter) -> Result<Subscription, SubscriptionError> {
        Ok(self.router.subscribe(filter).await)
    }
}
