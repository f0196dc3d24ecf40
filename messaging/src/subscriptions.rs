//! Subscription lifecycle: at most one open push channel per scope.
//!
//! Each open scope owns its subscription closer and the pump task consuming
//! the channel. Opening a scope closes the previous handle for that scope
//! first, so the exclusivity invariant holds by construction. The pump is
//! aborted before the channel closes, so no event is applied after close.
//!
//! `open` hands back a token identifying that occupancy of the scope; a
//! close presenting a stale token (the view was already replaced) is a
//! no-op, which is what makes double-close and close-after-switch safe.

use dchat_core::SubscriptionCloser;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// Logical listening scope, one per view kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Thread,
    Inbox,
    Badge,
}

struct ScopeGuard {
    token: u64,
    closer: SubscriptionCloser,
    pump: JoinHandle<()>,
}

#[derive(Default)]
pub struct SubscriptionManager {
    active: HashMap<Scope, ScopeGuard>,
    next_token: u64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an open scope and returns its occupancy token. Any previous
    /// handle for the scope is closed first (e.g. switching the open thread
    /// between counterparts).
    pub async fn open(
        &mut self,
        scope: Scope,
        closer: SubscriptionCloser,
        pump: JoinHandle<()>,
    ) -> u64 {
        self.close(scope).await;
        self.next_token += 1;
        let token = self.next_token;
        self.active.insert(scope, ScopeGuard { token, closer, pump });
        debug!(?scope, token, "subscription scope opened");
        token
    }

    /// Closes the scope if open, whoever holds it.
    pub async fn close(&mut self, scope: Scope) {
        if let Some(guard) = self.active.remove(&scope) {
            guard.pump.abort();
            guard.closer.close().await;
            debug!(?scope, token = guard.token, "subscription scope closed");
        }
    }

    /// Closes the scope only if `token` still owns it. A stale token (the
    /// scope was re-opened by a newer view) is a no-op, as is a repeat
    /// close.
    pub async fn close_token(&mut self, scope: Scope, token: u64) {
        let owns = self.active.get(&scope).is_some_and(|g| g.token == token);
        if owns {
            self.close(scope).await;
        }
    }

    /// Closes every open scope (sign-out).
    pub async fn close_all(&mut self) {
        let scopes: Vec<Scope> = self.active.keys().copied().collect();
        for scope in scopes {
            self.close(scope).await;
        }
    }

    pub fn is_open(&self, scope: Scope) -> bool {
        self.active.contains_key(&scope)
    }

    pub fn open_count(&self) -> usize {
        self.active.len()
    }
}
