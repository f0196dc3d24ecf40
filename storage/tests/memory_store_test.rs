//! Integration tests for [`storage::InMemoryMessageStore`].
//!
//! The in-memory store must behave as the SQLite store does; these tests
//! cover the shared contract plus the fault-injection hooks.

use dchat_core::{EventFilter, EventKind, MessageStore, WriteError};
use storage::InMemoryMessageStore;

/// **Test: Append/fetch/mark-read parity with the SQLite store.**
#[tokio::test]
async fn test_contract_parity() {
    let store = InMemoryMessageStore::new();

    store.append("alice", "bob", "one").await.expect("append");
    store.append("bob", "alice", "two").await.expect("append");
    store.append("alice", "bob", "three").await.expect("append");

    let range = store.fetch_range("alice", "bob").await.expect("range");
    assert_eq!(range.len(), 3);
    assert!(range.windows(2).all(|w| {
        (w[0].created_at, w[0].id.as_str()) <= (w[1].created_at, w[1].id.as_str())
    }));

    let inbox = store.fetch_inbox_log("bob").await.expect("inbox");
    assert_eq!(inbox.len(), 3);
    assert!(inbox.windows(2).all(|w| {
        (w[0].created_at, w[0].id.as_str()) >= (w[1].created_at, w[1].id.as_str())
    }));

    assert_eq!(store.count_unread("bob").await.expect("count"), 2);
    assert_eq!(store.mark_read("alice", "bob").await.expect("mark"), 2);
    assert_eq!(store.mark_read("alice", "bob").await.expect("mark"), 0);
    assert_eq!(store.count_unread("bob").await.expect("count"), 0);
}

/// **Test: Injected append failure leaves the store unchanged.**
#[tokio::test]
async fn test_injected_append_failure() {
    let store = InMemoryMessageStore::new();

    store.fail_next_append();
    let err = store
        .append("alice", "bob", "lost")
        .await
        .expect_err("Injected failure expected");
    assert!(matches!(err, WriteError::Unavailable(_)));
    assert!(store.is_empty().await);

    // Next append succeeds with a fresh id.
    let message = store.append("alice", "bob", "lost").await.expect("append");
    assert_eq!(store.len().await, 1);
    assert_eq!(message.content, "lost");
}

/// **Test: Redelivered events reach subscribers again (at-least-once).**
#[tokio::test]
async fn test_redeliver_duplicates_event() {
    let store = InMemoryMessageStore::new();

    let mut sub = store
        .subscribe(EventFilter::receiver("bob"))
        .await
        .expect("subscribe");

    store.append("alice", "bob", "hello").await.expect("append");
    let first = sub.recv().await.expect("event expected");
    assert_eq!(first.kind, EventKind::Created);

    store.redeliver(&first).await;
    let second = sub.recv().await.expect("duplicate expected");
    assert_eq!(second.message.id, first.message.id);

    sub.close().await;
}
