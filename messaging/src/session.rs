//! Session facade: thread, inbox, and badge wiring over a message store.
//!
//! [`MessagingSession`] owns the badge counter and the subscription
//! lifecycle for the signed-in user. [`ThreadHandle`] and [`InboxHandle`]
//! are the live views handed to the UI layer; each owns its scope's push
//! subscription through the shared [`SubscriptionManager`].
//!
//! Event pumps run as tokio tasks; all shared state sits behind
//! `tokio::sync` locks and is only mutated from those handlers, so there is
//! no cross-handler preemption to guard against.

use crate::aggregator::{self, ConversationSummary};
use crate::badge::UnreadBadge;
use crate::read_state::{ReadStateSynchronizer, ThreadReadState};
use crate::subscriptions::{Scope, SubscriptionManager};
use crate::thread_buffer::ThreadBuffer;
use dchat_core::{
    EventFilter, EventKind, Message, MessageStore, Result, Subscription, WriteError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// One signed-in user's messaging state.
pub struct MessagingSession {
    store: Arc<dyn MessageStore>,
    user_id: String,
    badge: Arc<RwLock<UnreadBadge>>,
    subscriptions: Arc<Mutex<SubscriptionManager>>,
    mark_read_debounce: Duration,
}

impl MessagingSession {
    /// Signs in: initializes the badge from a count query and opens the
    /// session-long badge subscription.
    pub async fn sign_in(store: Arc<dyn MessageStore>, user_id: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into();

        let unread = store.count_unread(&user_id).await?;
        let badge = Arc::new(RwLock::new(UnreadBadge::new()));
        badge.write().await.initialize(unread);

        let session = Self {
            store,
            user_id,
            badge,
            subscriptions: Arc::new(Mutex::new(SubscriptionManager::new())),
            mark_read_debounce: Duration::from_millis(150),
        };
        session.open_badge_scope().await?;

        info!(user_id = %session.user_id, unread, "session signed in");
        Ok(session)
    }

    /// Overrides the mark-read debounce window for threads opened afterwards.
    pub fn with_mark_read_debounce(mut self, window: Duration) -> Self {
        self.mark_read_debounce = window;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current unread total, push-driven; no polling needed.
    pub async fn badge_count(&self) -> u64 {
        self.badge.read().await.count()
    }

    /// Badge rendering: exact up to 9, "9+" above.
    pub async fn badge_display(&self) -> String {
        self.badge.read().await.display()
    }

    async fn open_badge_scope(&self) -> Result<()> {
        let subscription = self
            .store
            .subscribe(EventFilter::receiver(self.user_id.clone()))
            .await?;
        let closer = subscription.closer();

        let pump = tokio::spawn(badge_pump(
            subscription,
            self.badge.clone(),
            self.store.clone(),
            self.user_id.clone(),
        ));
        self.subscriptions
            .lock()
            .await
            .open(Scope::Badge, closer, pump)
            .await;
        Ok(())
    }

    /// Opens the thread with one counterpart: hydrates the buffer, opens the
    /// thread-scoped subscription (closing any previously open thread), and
    /// marks the counterpart's messages read.
    pub async fn open_thread(&self, counterpart_id: &str) -> Result<ThreadHandle> {
        // Subscribe before fetching so no event falls between the two; the
        // pump starts after hydration and the buffer dedups the overlap.
        let subscription = self
            .store
            .subscribe(EventFilter::pair(self.user_id.clone(), counterpart_id))
            .await?;
        let closer = subscription.closer();

        let history = self.store.fetch_range(&self.user_id, counterpart_id).await?;
        let buffer = Arc::new(RwLock::new(ThreadBuffer::new()));
        buffer.write().await.load(history);

        let read_sync = ReadStateSynchronizer::with_debounce(
            self.store.clone(),
            self.user_id.clone(),
            counterpart_id.to_string(),
            self.mark_read_debounce,
        );

        let pump = tokio::spawn(thread_pump(
            subscription,
            buffer.clone(),
            read_sync.clone(),
            self.user_id.clone(),
        ));
        let scope_token = self
            .subscriptions
            .lock()
            .await
            .open(Scope::Thread, closer, pump)
            .await;

        read_sync.on_open().await;

        Ok(ThreadHandle {
            store: self.store.clone(),
            user_id: self.user_id.clone(),
            counterpart_id: counterpart_id.to_string(),
            buffer,
            read_sync,
            subscriptions: self.subscriptions.clone(),
            scope_token,
        })
    }

    /// Opens the inbox: folds the full log into summaries and keeps them
    /// patched per push event.
    pub async fn open_inbox(&self) -> Result<InboxHandle> {
        let subscription = self
            .store
            .subscribe(EventFilter::receiver(self.user_id.clone()))
            .await?;
        let closer = subscription.closer();

        let log = self.store.fetch_inbox_log(&self.user_id).await?;
        let summaries = Arc::new(RwLock::new(aggregator::aggregate(&self.user_id, &log)));

        let pump = tokio::spawn(inbox_pump(
            subscription,
            summaries.clone(),
            self.store.clone(),
            self.user_id.clone(),
        ));
        let scope_token = self
            .subscriptions
            .lock()
            .await
            .open(Scope::Inbox, closer, pump)
            .await;

        Ok(InboxHandle {
            store: self.store.clone(),
            user_id: self.user_id.clone(),
            summaries,
            subscriptions: self.subscriptions.clone(),
            scope_token,
        })
    }

    /// True if a subscription is open for the scope. Exposed for lifecycle
    /// assertions.
    pub async fn scope_open(&self, scope: Scope) -> bool {
        self.subscriptions.lock().await.is_open(scope)
    }

    /// Signs out: closes every subscription and zeroes the badge.
    pub async fn sign_out(&self) {
        self.subscriptions.lock().await.close_all().await;
        self.badge.write().await.reset();
        info!(user_id = %self.user_id, "session signed out");
    }
}

/// Live view over one open thread.
pub struct ThreadHandle {
    store: Arc<dyn MessageStore>,
    user_id: String,
    counterpart_id: String,
    buffer: Arc<RwLock<ThreadBuffer>>,
    read_sync: ReadStateSynchronizer,
    subscriptions: Arc<Mutex<SubscriptionManager>>,
    scope_token: u64,
}

impl ThreadHandle {
    pub fn counterpart_id(&self) -> &str {
        &self.counterpart_id
    }

    /// Snapshot of the thread in ascending (created_at, id) order.
    /// Restartable: each call re-reads the live buffer.
    pub async fn messages(&self) -> Vec<Message> {
        self.buffer.read().await.messages().to_vec()
    }

    pub async fn read_state(&self) -> ThreadReadState {
        self.read_sync.state().await
    }

    /// Sends a message: the store append assigns the id, and the returned row
    /// goes into the buffer ahead of its echoed creation event, which the
    /// buffer then drops as a duplicate. A failed append surfaces to the
    /// caller and leaves the buffer without the entry; the view never shows
    /// a message that was not durably stored.
    pub async fn send(&self, content: &str) -> std::result::Result<Message, WriteError> {
        let message = match self
            .store
            .append(&self.user_id, &self.counterpart_id, content)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    counterpart_id = %self.counterpart_id,
                    error = %e,
                    "send failed"
                );
                return Err(e);
            }
        };

        self.buffer.write().await.insert(message.clone());
        Ok(message)
    }

    /// Tears down the thread view: read-state to Closed, subscription closed.
    /// Safe to call repeatedly, and a no-op for the subscription if another
    /// thread view has already taken over the scope.
    pub async fn close(&self) {
        self.read_sync.on_close().await;
        self.subscriptions
            .lock()
            .await
            .close_token(Scope::Thread, self.scope_token)
            .await;
    }
}

/// Live list of conversation summaries, descending by recency.
pub struct InboxHandle {
    store: Arc<dyn MessageStore>,
    user_id: String,
    summaries: Arc<RwLock<Vec<ConversationSummary>>>,
    subscriptions: Arc<Mutex<SubscriptionManager>>,
    scope_token: u64,
}

impl InboxHandle {
    /// Snapshot of the summaries, most recent conversation first.
    pub async fn summaries(&self) -> Vec<ConversationSummary> {
        self.summaries.read().await.clone()
    }

    /// Full refold from a fresh inbox log. The push-driven incremental path
    /// converges to the same result; this is the explicit resync entry.
    pub async fn refresh(&self) -> Result<()> {
        let log = self.store.fetch_inbox_log(&self.user_id).await?;
        *self.summaries.write().await = aggregator::aggregate(&self.user_id, &log);
        Ok(())
    }

    pub async fn close(&self) {
        self.subscriptions
            .lock()
            .await
            .close_token(Scope::Inbox, self.scope_token)
            .await;
    }
}

/// Applies badge events until the channel ends; a drop without an explicit
/// close triggers a one-time resynchronization from a fresh count.
async fn badge_pump(
    mut subscription: Subscription,
    badge: Arc<RwLock<UnreadBadge>>,
    store: Arc<dyn MessageStore>,
    user_id: String,
) {
    while let Some(event) = subscription.recv().await {
        badge.write().await.apply(&event);
    }

    match store.count_unread(&user_id).await {
        Ok(count) => {
            warn!(user_id = %user_id, count, "badge subscription dropped, resynchronized");
            badge.write().await.initialize(count);
        }
        Err(e) => {
            warn!(
                user_id = %user_id,
                error = %e,
                "badge subscription dropped and resynchronization failed"
            );
        }
    }
}

/// Merges pair events into the thread buffer; inbound creations also nudge
/// the read-state synchronizer so open threads never accumulate unread.
async fn thread_pump(
    mut subscription: Subscription,
    buffer: Arc<RwLock<ThreadBuffer>>,
    read_sync: ReadStateSynchronizer,
    user_id: String,
) {
    while let Some(event) = subscription.recv().await {
        match event.kind {
            EventKind::Created => {
                let inbound = event.message.unread_for(&user_id);
                let inserted = buffer.write().await.insert(event.message);
                if inserted && inbound {
                    read_sync.on_inbound().await;
                }
            }
            EventKind::Updated => {
                buffer.write().await.apply_update(&event.message);
            }
        }
    }
    warn!(user_id = %user_id, "thread subscription ended");
}

/// Rebuilds the affected counterpart's summary per event; a dropped channel
/// falls back to one full refold.
async fn inbox_pump(
    mut subscription: Subscription,
    summaries: Arc<RwLock<Vec<ConversationSummary>>>,
    store: Arc<dyn MessageStore>,
    user_id: String,
) {
    while let Some(event) = subscription.recv().await {
        let counterpart = event.message.counterpart_of(&user_id).to_string();
        match store.fetch_range(&user_id, &counterpart).await {
            Ok(pair_range) => {
                let mut summaries = summaries.write().await;
                aggregator::refresh_counterpart(&mut summaries, &user_id, &counterpart, &pair_range);
            }
            Err(e) => {
                warn!(
                    counterpart_id = %counterpart,
                    error = %e,
                    "incremental inbox refresh failed"
                );
            }
        }
    }

    match store.fetch_inbox_log(&user_id).await {
        Ok(log) => {
            warn!(user_id = %user_id, "inbox subscription dropped, resynchronized");
            *summaries.write().await = aggregator::aggregate(&user_id, &log);
        }
        Err(e) => {
            warn!(
                user_id = %user_id,
                error = %e,
                "inbox subscription dropped and resynchronization failed"
            );
        }
    }
}
