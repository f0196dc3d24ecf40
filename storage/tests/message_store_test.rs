//! Integration tests for [`storage::SqliteMessageStore`].
//!
//! Covers append, range/inbox queries, mark-read, unread counting, and event
//! publication using an in-memory SQLite database.

use dchat_core::{EventFilter, EventKind, MessageStore, WriteError};
use storage::SqliteMessageStore;

async fn store() -> SqliteMessageStore {
    SqliteMessageStore::new("sqlite::memory:")
        .await
        .expect("Failed to create store")
}

/// **Test: Append stores a message and fetch_range returns it in order.**
///
/// **Setup:** In-memory DB; append three messages alternating directions.
/// **Expected:** `fetch_range` returns all three ascending by creation, with
/// store-assigned distinct ids and `is_read = false`.
#[tokio::test]
async fn test_append_and_fetch_range() {
    let store = store().await;

    let m1 = store
        .append("alice", "bob", "first")
        .await
        .expect("Failed to append");
    let m2 = store
        .append("bob", "alice", "second")
        .await
        .expect("Failed to append");
    let m3 = store
        .append("alice", "bob", "third")
        .await
        .expect("Failed to append");

    assert_ne!(m1.id, m2.id);
    assert_ne!(m2.id, m3.id);
    assert!(!m1.is_read);

    let range = store
        .fetch_range("alice", "bob")
        .await
        .expect("Failed to fetch range");
    assert_eq!(range.len(), 3);
    assert_eq!(range[0].content, "first");
    assert_eq!(range[1].content, "second");
    assert_eq!(range[2].content, "third");
    assert!(range.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    // Restartable: a second call returns the same sequence.
    let again = store
        .fetch_range("bob", "alice")
        .await
        .expect("Failed to fetch range");
    assert_eq!(
        again.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        range.iter().map(|m| m.id.as_str()).collect::<Vec<_>>()
    );
}

/// **Test: Append rejects content that is empty after trimming.**
#[tokio::test]
async fn test_append_empty_content_rejected() {
    let store = store().await;

    let err = store
        .append("alice", "bob", "   \n\t ")
        .await
        .expect_err("Whitespace content should be rejected");
    assert!(matches!(err, WriteError::EmptyContent));

    assert_eq!(
        store
            .count_unread("bob")
            .await
            .expect("Failed to count unread"),
        0
    );
}

/// **Test: mark_read flips exactly the unread messages from one sender.**
///
/// **Setup:** alice→bob twice, carol→bob once, bob→alice once.
/// **Action:** `mark_read("alice", "bob")`.
/// **Expected:** Returns 2; carol's message and bob's own message untouched;
/// a second identical call returns 0 (idempotent).
#[tokio::test]
async fn test_mark_read_flips_only_pair_and_is_idempotent() {
    let store = store().await;

    store.append("alice", "bob", "one").await.expect("append");
    store.append("alice", "bob", "two").await.expect("append");
    store.append("carol", "bob", "three").await.expect("append");
    store.append("bob", "alice", "four").await.expect("append");

    let flipped = store
        .mark_read("alice", "bob")
        .await
        .expect("Failed to mark read");
    assert_eq!(flipped, 2);

    assert_eq!(store.count_unread("bob").await.expect("count"), 1);
    assert_eq!(store.count_unread("alice").await.expect("count"), 1);

    let again = store
        .mark_read("alice", "bob")
        .await
        .expect("Failed to mark read");
    assert_eq!(again, 0);
    assert_eq!(store.count_unread("bob").await.expect("count"), 1);
}

/// **Test: Messages appended after mark_read stay unread.**
#[tokio::test]
async fn test_mark_read_does_not_affect_later_appends() {
    let store = store().await;

    store.append("alice", "bob", "before").await.expect("append");
    store.mark_read("alice", "bob").await.expect("mark read");
    store.append("alice", "bob", "after").await.expect("append");

    assert_eq!(store.count_unread("bob").await.expect("count"), 1);
    let range = store.fetch_range("alice", "bob").await.expect("range");
    assert!(range[0].is_read);
    assert!(!range[1].is_read);
}

/// **Test: Inbox log returns both directions, newest first.**
#[tokio::test]
async fn test_fetch_inbox_log_descending() {
    let store = store().await;

    store.append("alice", "bob", "to bob").await.expect("append");
    store.append("bob", "alice", "to alice").await.expect("append");
    store.append("carol", "bob", "from carol").await.expect("append");
    store.append("carol", "dave", "unrelated").await.expect("append");

    let log = store
        .fetch_inbox_log("bob")
        .await
        .expect("Failed to fetch inbox log");
    assert_eq!(log.len(), 3);
    assert!(log.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert!(log.iter().all(|m| m.sender_id == "bob" || m.receiver_id == "bob"));
}

/// **Test: Subscriptions observe creation and update events.**
///
/// **Setup:** Subscribe for receiver bob; append alice→bob; mark it read.
/// **Expected:** One Created event (unread) then one Updated event
/// (read=true) for the same id; an unrelated receiver sees nothing.
#[tokio::test]
async fn test_subscribe_receives_created_and_updated_events() {
    let store = store().await;

    let mut bob_sub = store
        .subscribe(EventFilter::receiver("bob"))
        .await
        .expect("Failed to subscribe");
    let mut carol_sub = store
        .subscribe(EventFilter::receiver("carol"))
        .await
        .expect("Failed to subscribe");

    let appended = store.append("alice", "bob", "hello").await.expect("append");

    let created = bob_sub.recv().await.expect("Created event expected");
    assert_eq!(created.kind, EventKind::Created);
    assert_eq!(created.message.id, appended.id);
    assert!(!created.message.is_read);

    store.mark_read("alice", "bob").await.expect("mark read");

    let updated = bob_sub.recv().await.expect("Updated event expected");
    assert_eq!(updated.kind, EventKind::Updated);
    assert_eq!(updated.message.id, appended.id);
    assert!(updated.message.is_read);

    carol_sub.close().await;
    assert!(carol_sub.recv().await.is_none());
}
