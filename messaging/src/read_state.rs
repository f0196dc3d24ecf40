//! Read-state synchronization for an open thread.
//!
//! While a thread is visibly open, the counterpart's messages must not sit
//! unread: mark-read fires on open and again on each inbound message, with a
//! debounce window so a burst coalesces into one store call. A failed
//! mark-read is swallowed (a stale "unread" indicator beats a false "read"
//! one) and the next trigger retries.

use dchat_core::MessageStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Per-thread read state: `Closed → Open → ReadPending → Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadReadState {
    Closed,
    Open,
    ReadPending,
}

#[derive(Clone)]
pub struct ReadStateSynchronizer {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    store: Arc<dyn MessageStore>,
    self_id: String,
    counterpart_id: String,
    state: Mutex<ThreadReadState>,
    mark_scheduled: AtomicBool,
    debounce: Duration,
}

impl ReadStateSynchronizer {
    pub fn new(
        store: Arc<dyn MessageStore>,
        self_id: impl Into<String>,
        counterpart_id: impl Into<String>,
    ) -> Self {
        Self::with_debounce(store, self_id, counterpart_id, DEFAULT_DEBOUNCE)
    }

    /// Constructs with an explicit debounce window for inbound-message
    /// coalescing.
    pub fn with_debounce(
        store: Arc<dyn MessageStore>,
        self_id: impl Into<String>,
        counterpart_id: impl Into<String>,
        window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                store,
                self_id: self_id.into(),
                counterpart_id: counterpart_id.into(),
                state: Mutex::new(ThreadReadState::Closed),
                mark_scheduled: AtomicBool::new(false),
                debounce: window,
            }),
        }
    }

    /// Thread view mounted: the thread is open and its messages are marked
    /// read immediately.
    pub async fn on_open(&self) {
        *self.inner.state.lock().await = ThreadReadState::Open;
        self.run_mark_read().await;
    }

    /// New inbound message while the thread is open: schedules a mark-read,
    /// coalescing with any already-scheduled one.
    pub async fn on_inbound(&self) {
        if *self.inner.state.lock().await == ThreadReadState::Closed {
            return;
        }
        if self.inner.mark_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let sync = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(sync.inner.debounce).await;
            sync.inner.mark_scheduled.store(false, Ordering::SeqCst);
            sync.run_mark_read().await;
        });
    }

    /// Thread view unmounted. Already-read state persists; nothing else runs.
    pub async fn on_close(&self) {
        *self.inner.state.lock().await = ThreadReadState::Closed;
    }

    pub async fn state(&self) -> ThreadReadState {
        *self.inner.state.lock().await
    }

    async fn run_mark_read(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if *state == ThreadReadState::Closed {
                return;
            }
            *state = ThreadReadState::ReadPending;
        }

        match self
            .inner
            .store
            .mark_read(&self.inner.counterpart_id, &self.inner.self_id)
            .await
        {
            Ok(flipped) => {
                debug!(
                    counterpart_id = %self.inner.counterpart_id,
                    flipped,
                    "marked thread read"
                );
            }
            Err(e) => {
                // Do not decrement anything locally; the next trigger retries.
                warn!(
                    counterpart_id = %self.inner.counterpart_id,
                    error = %e,
                    "mark-read failed, leaving unread state stale"
                );
            }
        }

        let mut state = self.inner.state.lock().await;
        if *state == ThreadReadState::ReadPending {
            *state = ThreadReadState::Open;
        }
    }
}
