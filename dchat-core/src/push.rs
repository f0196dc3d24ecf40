//! Push channel: predicate-filtered fan-out of row-change events.
//!
//! [`PushRouter`] holds the subscriber registry; store implementations publish
//! into it after each durable write. [`Subscription`] is the owning handle a
//! view component consumes events from; closing it is the unsubscribe
//! operation and is idempotent.

use crate::types::{EventFilter, MessageEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

struct Subscriber {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<MessageEvent>,
}

type Registry = RwLock<HashMap<u64, Subscriber>>;

/// Fan-out registry for row-change events. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct PushRouter {
    subscribers: Arc<Registry>,
    next_id: Arc<AtomicU64>,
}

impl PushRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for events matching `filter`.
    pub async fn subscribe(&self, filter: EventFilter) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .await
            .insert(id, Subscriber { filter, sender });
        debug!(subscription_id = id, "push subscription registered");
        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.subscribers),
            closed: false,
        }
    }

    /// Delivers `event` to every subscriber whose predicate matches. A send
    /// onto an already-dropped receiver is ignored; the registry entry goes
    /// away when the handle is closed.
    pub async fn publish(&self, event: &MessageEvent) {
        let subscribers = self.subscribers.read().await;
        for (id, subscriber) in subscribers.iter() {
            if subscriber.filter.matches(event) {
                if subscriber.sender.send(event.clone()).is_err() {
                    debug!(subscription_id = *id, "subscriber receiver gone, skipping");
                }
            }
        }
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

/// One open push channel. Owned by the view component that opened it; must be
/// closed exactly once on view change, though extra closes are no-ops.
pub struct Subscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<MessageEvent>,
    registry: Weak<Registry>,
    closed: bool,
}

impl Subscription {
    /// Receives the next matching event. Returns `None` once the channel is
    /// closed, whether by this handle, by a [`SubscriptionCloser`], or
    /// because the underlying router went away.
    pub async fn recv(&mut self) -> Option<MessageEvent> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// A detached closer for this subscription, usable from another task
    /// while `recv` is in flight.
    pub fn closer(&self) -> SubscriptionCloser {
        SubscriptionCloser {
            id: self.id,
            registry: self.registry.clone(),
        }
    }

    /// Unsubscribes. Idempotent and safe after the underlying channel already
    /// failed; no event is observed through this handle after it returns.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.write().await.remove(&self.id);
        }
        self.receiver.close();
        // Drain anything delivered before the registry entry was removed.
        while self.receiver.try_recv().is_ok() {}
        debug!(subscription_id = self.id, "push subscription closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Closes a [`Subscription`] from outside the task that owns it. Removing the
/// registry entry drops the sender, so a pending `recv` resolves to `None`.
#[derive(Clone)]
pub struct SubscriptionCloser {
    id: u64,
    registry: Weak<Registry>,
}

impl SubscriptionCloser {
    /// Idempotent; a missing registry entry (already closed, or the router is
    /// gone) is a no-op.
    pub async fn close(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.write().await.remove(&self.id).is_some() {
                debug!(subscription_id = self.id, "push subscription closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventKind, Message};
    use chrono::Utc;

    fn event(id: &str, sender: &str, receiver: &str) -> MessageEvent {
        MessageEvent {
            kind: EventKind::Created,
            message: Message {
                id: id.to_string(),
                sender_id: sender.to_string(),
                receiver_id: receiver.to_string(),
                content: "hello".to_string(),
                is_read: false,
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber_only() {
        let router = PushRouter::new();
        let mut bob = router.subscribe(EventFilter::receiver("bob")).await;
        let mut carol = router.subscribe(EventFilter::receiver("carol")).await;

        router.publish(&event("m1", "alice", "bob")).await;

        let received = bob.recv().await.expect("bob should receive the event");
        assert_eq!(received.message.id, "m1");

        carol.close().await;
        assert_eq!(carol.recv().await.map(|e| e.message.id), None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_drops_in_flight_events() {
        let router = PushRouter::new();
        let mut sub = router.subscribe(EventFilter::receiver("bob")).await;

        router.publish(&event("m1", "alice", "bob")).await;
        sub.close().await;
        sub.close().await;

        assert!(sub.is_closed());
        assert!(sub.recv().await.is_none());
        assert_eq!(router.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_closer_unblocks_pending_recv() {
        let router = PushRouter::new();
        let mut sub = router.subscribe(EventFilter::receiver("bob")).await;
        let closer = sub.closer();

        let pump = tokio::spawn(async move { sub.recv().await });
        closer.close().await;
        closer.close().await;

        let result = pump.await.expect("pump task should not panic");
        assert!(result.is_none());
        assert_eq!(router.subscriber_count().await, 0);
    }
}
