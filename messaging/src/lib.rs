//! Messaging subsystem: real-time direct messaging and unread tracking.
//!
//! ## Modules
//!
//! - [`thread_buffer`] – Deduplicating, timestamp-ordered view of one thread
//! - [`aggregator`] – Conversation summaries for the inbox list
//! - [`badge`] – Process-wide unread counter
//! - [`read_state`] – Read-state synchronization for an open thread
//! - [`subscriptions`] – At-most-one push subscription per scope
//! - [`session`] – MessagingSession facade exposed to the view layer

pub mod aggregator;
pub mod badge;
pub mod read_state;
pub mod session;
pub mod subscriptions;
pub mod thread_buffer;

pub use aggregator::{aggregate, refresh_counterpart, ConversationSummary};
pub use badge::UnreadBadge;
pub use read_state::{ReadStateSynchronizer, ThreadReadState};
pub use session::{InboxHandle, MessagingSession, ThreadHandle};
pub use subscriptions::{Scope, SubscriptionManager};
pub use thread_buffer::ThreadBuffer;
