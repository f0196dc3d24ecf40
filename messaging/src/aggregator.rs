//! Inbox aggregation: one conversation summary per counterpart.
//!
//! A summary is a projection of the message log, never persisted. The full
//! fold and the per-counterpart incremental rebuild share one code path so
//! the two can never drift apart.

use dchat_core::Message;
use serde::Serialize;
use std::collections::HashMap;

/// Last message and unread count for one counterpart, relative to a viewing
/// user.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub counterpart_id: String,
    pub last_message: Message,
    pub unread_count: u64,
}

/// True if `candidate` should replace `current` as the last message: a
/// strictly newer timestamp, or the lexicographically greater id on a tie.
fn replaces_last(candidate: &Message, current: &Message) -> bool {
    (candidate.created_at, candidate.id.as_str()) > (current.created_at, current.id.as_str())
}

fn sort_for_display(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| {
        (b.last_message.created_at, b.last_message.id.as_str())
            .cmp(&(a.last_message.created_at, a.last_message.id.as_str()))
    });
}

/// Folds the inbox log into one summary per counterpart. The input may be in
/// any order; each message contributes to exactly one summary, and each
/// unread message addressed to `self_id` is counted exactly once. Output is
/// sorted for display, most recent conversation first.
pub fn aggregate(self_id: &str, log: &[Message]) -> Vec<ConversationSummary> {
    let mut groups: HashMap<String, ConversationSummary> = HashMap::new();

    for message in log {
        let counterpart = message.counterpart_of(self_id).to_string();
        let unread = u64::from(message.unread_for(self_id));

        if let Some(summary) = groups.get_mut(&counterpart) {
            if replaces_last(message, &summary.last_message) {
                summary.last_message = message.clone();
            }
            summary.unread_count += unread;
        } else {
            groups.insert(
                counterpart.clone(),
                ConversationSummary {
                    counterpart_id: counterpart,
                    last_message: message.clone(),
                    unread_count: unread,
                },
            );
        }
    }

    let mut summaries: Vec<ConversationSummary> = groups.into_values().collect();
    sort_for_display(&mut summaries);
    summaries
}

/// Rebuilds the summary for one counterpart from a freshly fetched pair
/// range, leaving the rest untouched. Running the same fold over the pair
/// range keeps this path and a full refresh in agreement. An empty range
/// removes the summary.
pub fn refresh_counterpart(
    summaries: &mut Vec<ConversationSummary>,
    self_id: &str,
    counterpart_id: &str,
    pair_range: &[Message],
) {
    summaries.retain(|s| s.counterpart_id != counterpart_id);
    summaries.extend(
        aggregate(self_id, pair_range)
            .into_iter()
            .filter(|s| s.counterpart_id == counterpart_id),
    );
    sort_for_display(summaries);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(id: &str, sender: &str, receiver: &str, ts_ms: i64, read: bool) -> Message {
        Message {
            id: id.to_string(),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            content: format!("msg {}", id),
            is_read: read,
            created_at: Utc.timestamp_millis_opt(ts_ms).unwrap(),
        }
    }

    #[test]
    fn test_fold_groups_by_counterpart_and_counts_unread_once() {
        let log = vec![
            message("m4", "carol", "self", 400, false),
            message("m3", "self", "alice", 300, false),
            message("m2", "alice", "self", 200, false),
            message("m1", "alice", "self", 100, true),
        ];

        let summaries = aggregate("self", &log);
        assert_eq!(summaries.len(), 2);

        // Display order: carol (t=400) before alice (t=300).
        assert_eq!(summaries[0].counterpart_id, "carol");
        assert_eq!(summaries[0].unread_count, 1);
        assert_eq!(summaries[1].counterpart_id, "alice");
        assert_eq!(summaries[1].last_message.id, "m3");
        // m1 is read and m3 is outbound; only m2 counts.
        assert_eq!(summaries[1].unread_count, 1);
    }

    #[test]
    fn test_fold_is_order_independent() {
        let mut log = vec![
            message("m1", "alice", "self", 100, false),
            message("m2", "self", "alice", 200, false),
            message("m3", "alice", "self", 300, false),
        ];
        let forward = aggregate("self", &log);
        log.reverse();
        let backward = aggregate("self", &log);

        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].last_message.id, backward[0].last_message.id);
        assert_eq!(forward[0].unread_count, backward[0].unread_count);
    }

    #[test]
    fn test_equal_timestamp_tie_breaks_on_greater_id() {
        let log = vec![
            message("m-b", "alice", "self", 100, false),
            message("m-a", "alice", "self", 100, false),
        ];
        let summaries = aggregate("self", &log);
        assert_eq!(summaries[0].last_message.id, "m-b");

        // Same result regardless of input order.
        let reversed: Vec<Message> = log.into_iter().rev().collect();
        let summaries = aggregate("self", &reversed);
        assert_eq!(summaries[0].last_message.id, "m-b");
    }

    #[test]
    fn test_refresh_counterpart_matches_full_fold() {
        let log = vec![
            message("m1", "alice", "self", 100, false),
            message("m2", "carol", "self", 200, false),
            message("m3", "alice", "self", 300, false),
        ];
        let full = aggregate("self", &log);

        // Start from a stale view missing alice's latest message.
        let stale_log = vec![
            message("m1", "alice", "self", 100, false),
            message("m2", "carol", "self", 200, false),
        ];
        let mut incremental = aggregate("self", &stale_log);
        let alice_range = vec![
            message("m1", "alice", "self", 100, false),
            message("m3", "alice", "self", 300, false),
        ];
        refresh_counterpart(&mut incremental, "self", "alice", &alice_range);

        assert_eq!(incremental.len(), full.len());
        for (a, b) in incremental.iter().zip(full.iter()) {
            assert_eq!(a.counterpart_id, b.counterpart_id);
            assert_eq!(a.last_message.id, b.last_message.id);
            assert_eq!(a.unread_count, b.unread_count);
        }
    }

    #[test]
    fn test_refresh_with_empty_range_removes_summary() {
        let log = vec![message("m1", "alice", "self", 100, false)];
        let mut summaries = aggregate("self", &log);
        assert_eq!(summaries.len(), 1);

        refresh_counterpart(&mut summaries, "self", "alice", &[]);
        assert!(summaries.is_empty());
    }
}
