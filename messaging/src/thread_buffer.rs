//! Deduplicating, timestamp-ordered buffer for one open thread.
//!
//! The buffer merges two uncoordinated inputs, messages the local user just
//! sent and the same rows echoed back by the push channel, into one ordered
//! sequence. Identity (the store-assigned id) is the sole dedup key; content
//! or timestamp equality never is, since two distinct messages may share
//! both. Ordering is `(created_at, id)` so out-of-order delivery cannot
//! corrupt the displayed sequence.

use chrono::{DateTime, Utc};
use dchat_core::Message;

#[derive(Debug, Default)]
pub struct ThreadBuffer {
    messages: Vec<Message>,
    hydrated: bool,
}

fn sort_key(message: &Message) -> (DateTime<Utc>, &str) {
    (message.created_at, message.id.as_str())
}

impl ThreadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with a fetched history and marks the buffer
    /// hydrated. The input may arrive in any order.
    pub fn load(&mut self, mut history: Vec<Message>) {
        history.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        history.dedup_by(|a, b| a.id == b.id);
        self.messages = history;
        self.hydrated = true;
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Inserts a message in `(created_at, id)` order. A message whose id is
    /// already present is ignored. Returns whether it was inserted.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        let at_tail = self
            .messages
            .last()
            .map_or(true, |last| sort_key(last) <= sort_key(&message));
        if at_tail {
            self.messages.push(message);
        } else {
            let pos = self
                .messages
                .partition_point(|m| sort_key(m) < sort_key(&message));
            self.messages.insert(pos, message);
        }
        true
    }

    /// Applies a read-state update to the entry with the same id. The flag
    /// only ever transitions false→true; an update carrying `is_read = false`
    /// never reverts an entry.
    pub fn apply_update(&mut self, update: &Message) {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == update.id) {
            if update.is_read {
                existing.is_read = true;
            }
        }
    }

    /// Removes the entry with the given id (send rollback). Returns whether
    /// an entry was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.messages.iter().position(|m| m.id == id) {
            Some(pos) => {
                self.messages.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(id: &str, ts_ms: i64, content: &str) -> Message {
        Message {
            id: id.to_string(),
            sender_id: "x".to_string(),
            receiver_id: "y".to_string(),
            content: content.to_string(),
            is_read: false,
            created_at: Utc.timestamp_millis_opt(ts_ms).unwrap(),
        }
    }

    #[test]
    fn test_insert_dedups_by_id() {
        let mut buffer = ThreadBuffer::new();
        assert!(buffer.insert(message("m1", 100, "hello")));
        assert!(!buffer.insert(message("m1", 100, "hello")));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_identical_content_and_timestamp_stay_distinct() {
        let mut buffer = ThreadBuffer::new();
        assert!(buffer.insert(message("m1", 100, "hello")));
        assert!(buffer.insert(message("m2", 100, "hello")));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_out_of_order_delivery_restores_timestamp_order() {
        let mut buffer = ThreadBuffer::new();
        // m2 (t=150) delivered before m1 (t=140).
        buffer.insert(message("m2", 150, "second"));
        buffer.insert(message("m1", 140, "first"));

        let ids: Vec<&str> = buffer.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_load_sorts_and_dedups() {
        let mut buffer = ThreadBuffer::new();
        assert!(!buffer.is_hydrated());
        buffer.load(vec![
            message("m3", 300, "c"),
            message("m1", 100, "a"),
            message("m1", 100, "a"),
            message("m2", 200, "b"),
        ]);
        assert!(buffer.is_hydrated());
        let ids: Vec<&str> = buffer.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_remove_for_rollback() {
        let mut buffer = ThreadBuffer::new();
        buffer.insert(message("m1", 100, "kept"));
        buffer.insert(message("m2", 200, "rolled back"));

        assert!(buffer.remove("m2"));
        assert!(!buffer.remove("m2"));
        assert_eq!(buffer.len(), 1);
        assert!(buffer.contains("m1"));
    }

    #[test]
    fn test_apply_update_never_reverts_read_flag() {
        let mut buffer = ThreadBuffer::new();
        buffer.insert(message("m1", 100, "hello"));

        let mut read = message("m1", 100, "hello");
        read.is_read = true;
        buffer.apply_update(&read);
        assert!(buffer.messages()[0].is_read);

        let unread = message("m1", 100, "hello");
        buffer.apply_update(&unread);
        assert!(buffer.messages()[0].is_read);
    }
}
