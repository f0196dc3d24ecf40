//! Process-wide unread counter backing the navigation badge.
//!
//! An owned counter with an explicit lifecycle: initialized from a count
//! query at sign-in, patched per push event, reset at sign-out. Callers feed
//! it only events addressed to the badge owner.

use dchat_core::{EventKind, MessageEvent};

#[derive(Debug, Default)]
pub struct UnreadBadge {
    count: u64,
}

impl UnreadBadge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the count from a store-side count query.
    pub fn initialize(&mut self, count: u64) {
        self.count = count;
    }

    /// Applies one push event. Creations of still-unread messages increment;
    /// updates whose read flag flipped to true decrement, floored at zero so
    /// out-of-order or duplicated delivery cannot drive the count negative.
    pub fn apply(&mut self, event: &MessageEvent) {
        match event.kind {
            EventKind::Created if !event.message.is_read => self.count += 1,
            EventKind::Updated if event.message.is_read => {
                self.count = self.count.saturating_sub(1)
            }
            _ => {}
        }
    }

    /// Exact unread total, uncapped.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rendered value: exact up to 9, "9+" above.
    pub fn display(&self) -> String {
        if self.count > 9 {
            "9+".to_string()
        } else {
            self.count.to_string()
        }
    }

    /// Sign-out: back to zero.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
