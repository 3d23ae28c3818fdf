//! Per-conversation activity statistics.
//!
//! Tracks message counts, last-active timestamps, the set of distinct
//! participants seen, and intent-tag frequencies for each conversation.
//! Mutated only by the same append path that records a message, and
//! destroyed when [`ConversationHistoryStore`] evicts or clears the
//! owning conversation — the tracker has no eviction policy of its own.
//!
//! [`ConversationHistoryStore`]: crate::memory::history::ConversationHistoryStore

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

// ── Stats types ──────────────────────────────────────────────────

/// Aggregates for one conversation.
#[derive(Debug, Clone)]
pub struct ActivityStats {
    /// Total messages recorded for this conversation.
    pub message_count: u64,
    /// Timestamp of the most recent message.
    pub last_active: DateTime<Utc>,
    /// Distinct participant display names seen.
    pub participants: BTreeSet<String>,
    /// Intent tag frequencies, in first-seen order.
    intents: Vec<(String, u64)>,
}

impl ActivityStats {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            message_count: 0,
            last_active: now,
            participants: BTreeSet::new(),
            intents: Vec::new(),
        }
    }

    /// Intent tags with their counts, in first-seen order.
    pub fn intents(&self) -> &[(String, u64)] {
        &self.intents
    }
}

/// Aggregates across every tracked conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalStats {
    /// Number of conversations currently tracked.
    pub conversations: usize,
    /// Total messages across all tracked conversations.
    pub total_messages: u64,
    /// Distinct participant names across all tracked conversations.
    pub unique_participants: usize,
}

// ── ActivityStatisticsTracker ────────────────────────────────────

/// Keeps [`ActivityStats`] per conversation id.
///
/// Unbounded on its own — the history store removes entries whenever it
/// evicts or clears a conversation, so this map never outgrows the
/// history LRU.
#[derive(Debug, Default)]
pub struct ActivityStatisticsTracker {
    stats: HashMap<String, ActivityStats>,
}

impl ActivityStatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message: bumps the count, refreshes last-active,
    /// adds the participant, and increments the intent counter.
    pub fn record_activity(
        &mut self,
        conversation_id: &str,
        participant_name: &str,
        intent: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let entry = self
            .stats
            .entry(conversation_id.to_string())
            .or_insert_with(|| ActivityStats::new(now));

        entry.message_count += 1;
        entry.last_active = now;
        if !participant_name.is_empty() {
            entry.participants.insert(participant_name.to_string());
        }

        if let Some(tag) = intent {
            if !tag.is_empty() {
                match entry.intents.iter_mut().find(|(name, _)| name == tag) {
                    Some((_, count)) => *count += 1,
                    None => entry.intents.push((tag.to_string(), 1)),
                }
            }
        }
    }

    /// Stats for one conversation, if tracked.
    pub fn conversation_stats(&self, conversation_id: &str) -> Option<&ActivityStats> {
        self.stats.get(conversation_id)
    }

    /// The `n` highest-frequency intents for a conversation.
    ///
    /// Ties keep first-seen order — the sort is stable over the
    /// first-seen vec.
    pub fn top_intents(&self, conversation_id: &str, n: usize) -> Vec<(String, u64)> {
        let Some(entry) = self.stats.get(conversation_id) else {
            return Vec::new();
        };
        let mut ranked = entry.intents.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Aggregates across every tracked conversation.
    pub fn global_stats(&self) -> GlobalStats {
        let mut all_participants: BTreeSet<&str> = BTreeSet::new();
        let mut total_messages = 0;
        for stats in self.stats.values() {
            total_messages += stats.message_count;
            for name in &stats.participants {
                all_participants.insert(name);
            }
        }
        GlobalStats {
            conversations: self.stats.len(),
            total_messages,
            unique_participants: all_participants.len(),
        }
    }

    /// Drop stats for one conversation (eviction/clear cascade).
    pub fn remove(&mut self, conversation_id: &str) {
        self.stats.remove(conversation_id);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.stats.clear();
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, secs).unwrap()
    }

    #[test]
    fn record_activity_counts_messages() {
        let mut tracker = ActivityStatisticsTracker::new();
        tracker.record_activity("t1", "Alice", None, at(0));
        tracker.record_activity("t1", "Bob", None, at(5));

        let stats = tracker.conversation_stats("t1").unwrap();
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.last_active, at(5));
        assert_eq!(stats.participants.len(), 2);
    }

    #[test]
    fn intents_accumulate_in_first_seen_order() {
        let mut tracker = ActivityStatisticsTracker::new();
        tracker.record_activity("t1", "Alice", Some("weather"), at(0));
        tracker.record_activity("t1", "Alice", Some("music"), at(1));
        tracker.record_activity("t1", "Alice", Some("weather"), at(2));

        let stats = tracker.conversation_stats("t1").unwrap();
        assert_eq!(
            stats.intents(),
            &[("weather".to_string(), 2), ("music".to_string(), 1)]
        );
    }

    #[test]
    fn top_intents_ranks_by_frequency() {
        let mut tracker = ActivityStatisticsTracker::new();
        for _ in 0..3 {
            tracker.record_activity("t1", "Alice", Some("music"), at(0));
        }
        tracker.record_activity("t1", "Alice", Some("weather"), at(1));

        let top = tracker.top_intents("t1", 2);
        assert_eq!(top[0].0, "music");
        assert_eq!(top[0].1, 3);
        assert_eq!(top[1].0, "weather");
    }

    #[test]
    fn top_intents_ties_keep_first_seen_order() {
        let mut tracker = ActivityStatisticsTracker::new();
        tracker.record_activity("t1", "Alice", Some("jokes"), at(0));
        tracker.record_activity("t1", "Alice", Some("weather"), at(1));
        tracker.record_activity("t1", "Alice", Some("music"), at(2));

        // All tied at 1 — first-seen order wins
        let top = tracker.top_intents("t1", 3);
        let names: Vec<&str> = top.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["jokes", "weather", "music"]);
    }

    #[test]
    fn top_intents_for_unknown_conversation_is_empty() {
        let tracker = ActivityStatisticsTracker::new();
        assert!(tracker.top_intents("nope", 5).is_empty());
    }

    #[test]
    fn empty_intent_tags_are_ignored() {
        let mut tracker = ActivityStatisticsTracker::new();
        tracker.record_activity("t1", "Alice", Some(""), at(0));
        tracker.record_activity("t1", "Alice", None, at(1));

        let stats = tracker.conversation_stats("t1").unwrap();
        assert!(stats.intents().is_empty());
        assert_eq!(stats.message_count, 2);
    }

    #[test]
    fn global_stats_deduplicate_participants() {
        let mut tracker = ActivityStatisticsTracker::new();
        tracker.record_activity("t1", "Alice", None, at(0));
        tracker.record_activity("t2", "Alice", None, at(1));
        tracker.record_activity("t2", "Bob", None, at(2));

        let global = tracker.global_stats();
        assert_eq!(global.conversations, 2);
        assert_eq!(global.total_messages, 3);
        assert_eq!(global.unique_participants, 2);
    }

    #[test]
    fn remove_drops_one_conversation() {
        let mut tracker = ActivityStatisticsTracker::new();
        tracker.record_activity("t1", "Alice", None, at(0));
        tracker.record_activity("t2", "Bob", None, at(1));

        tracker.remove("t1");
        assert!(tracker.conversation_stats("t1").is_none());
        assert!(tracker.conversation_stats("t2").is_some());
    }
}
