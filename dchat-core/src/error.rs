use thiserror::Error;

/// Errors from append / mark-read writes against the store.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Empty message content")]
    EmptyContent,

    #[error("Unknown receiver: {0}")]
    UnknownReceiver(String),
}

/// Errors establishing or holding a push subscription.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Failed to establish subscription: {0}")]
    Establish(String),

    #[error("Subscription channel dropped: {0}")]
    Dropped(String),
}

/// Umbrella error for the messaging core.
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, MessagingError>;
