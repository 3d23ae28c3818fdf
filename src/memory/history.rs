//! Per-conversation bounded message history.
//!
//! Two levels of bounding keep memory flat no matter how many
//! conversations the assistant sees:
//!
//! 1. **Conversation level** — an [`LruCache`] keyed by conversation id
//!    (capacity `max_conversations`). Appending to one conversation may
//!    evict a colder conversation's entire record; that is routine
//!    capacity management, not an error.
//! 2. **Message level** — each record holds a FIFO of at most
//!    `max_history` messages, oldest dropped first.
//!
//! Activity statistics share the eviction lifecycle: when a conversation
//! is evicted or cleared, its stats go with it.
//!
//! `get_formatted_history` produces a prompt-ready string for the
//! (out-of-scope) prompt-building layer: recent messages as
//! `[HH:MM] Name: text` lines, prefixed with the stored summary once
//! the history FIFO is at capacity.

use crate::memory::lru::LruCache;
use crate::memory::stats::{ActivityStatisticsTracker, ActivityStats, GlobalStats};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::debug;

// ── Message and record types ─────────────────────────────────────

/// One message in a conversation's history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Display name of the sender.
    pub sender: String,
    /// Message text.
    pub text: String,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
    /// Detected intent tag, if the command layer classified one.
    pub intent: Option<String>,
}

/// The per-conversation record: a bounded message FIFO plus an
/// optional free-text summary of older, already-trimmed context.
#[derive(Debug, Clone, Default)]
struct ConversationRecord {
    messages: VecDeque<ChatMessage>,
    summary: Option<String>,
}

// ── ConversationHistoryStore ─────────────────────────────────────

/// Bounded store of recent messages per conversation.
pub struct ConversationHistoryStore {
    records: LruCache<String, ConversationRecord>,
    stats: ActivityStatisticsTracker,
    max_history: usize,
    context_window: usize,
}

impl ConversationHistoryStore {
    /// Create a store holding at most `max_conversations` conversations
    /// of `max_history` messages each. `context_window` is the default
    /// formatted-history length.
    pub fn new(max_conversations: usize, max_history: usize, context_window: usize) -> Self {
        Self {
            records: LruCache::new(max_conversations),
            stats: ActivityStatisticsTracker::new(),
            max_history: max_history.max(1),
            context_window: context_window.max(1),
        }
    }

    /// Append a message, creating the conversation if needed.
    ///
    /// Trims the conversation's FIFO to `max_history`, records activity
    /// stats, and touches the conversation in the LRU — which may evict
    /// a different, older conversation entirely.
    pub fn append_message(
        &mut self,
        conversation_id: &str,
        sender_name: &str,
        text: &str,
        intent: Option<&str>,
    ) {
        self.append_message_at(conversation_id, sender_name, text, intent, Utc::now());
    }

    /// [`append_message`](Self::append_message) with an explicit clock.
    pub fn append_message_at(
        &mut self,
        conversation_id: &str,
        sender_name: &str,
        text: &str,
        intent: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let message = ChatMessage {
            sender: sender_name.to_string(),
            text: text.to_string(),
            timestamp: now,
            intent: intent.map(|s| s.to_string()),
        };

        match self.records.get_mut(&conversation_id.to_string()) {
            Some(record) => {
                record.messages.push_back(message);
                while record.messages.len() > self.max_history {
                    record.messages.pop_front();
                }
            }
            None => {
                let mut record = ConversationRecord::default();
                record.messages.push_back(message);
                if let Some((evicted_id, _)) =
                    self.records.put(conversation_id.to_string(), record)
                {
                    debug!(conversation = %evicted_id, "evicted cold conversation history");
                    self.stats.remove(&evicted_id);
                }
            }
        }

        self.stats
            .record_activity(conversation_id, sender_name, intent, now);
    }

    /// Snapshot of the retained messages, oldest first.
    pub fn get_history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.records
            .peek(&conversation_id.to_string())
            .map(|record| record.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Up to `limit` most recent messages as a prompt-ready string.
    ///
    /// The stored summary is prepended iff one exists and the history
    /// FIFO is at capacity (older context has actually been trimmed).
    /// Returns an empty string for an unknown conversation.
    pub fn get_formatted_history(&self, conversation_id: &str, limit: Option<usize>) -> String {
        let Some(record) = self.records.peek(&conversation_id.to_string()) else {
            return String::new();
        };

        let limit = limit.unwrap_or(self.context_window).max(1);
        let skip = record.messages.len().saturating_sub(limit);

        let mut out = String::new();
        if record.messages.len() >= self.max_history {
            if let Some(summary) = &record.summary {
                out.push_str("Summary of earlier conversation: ");
                out.push_str(summary);
                out.push('\n');
            }
        }

        for message in record.messages.iter().skip(skip) {
            out.push_str(&format!(
                "[{}] {}: {}\n",
                message.timestamp.format("%H:%M"),
                message.sender,
                message.text
            ));
        }

        out
    }

    /// Remove a conversation's record and statistics. Idempotent.
    pub fn clear_history(&mut self, conversation_id: &str) {
        self.records.remove(&conversation_id.to_string());
        self.stats.remove(conversation_id);
    }

    /// Attach a free-text summary, creating the record if absent.
    ///
    /// Callers produce the summary text themselves; the store only
    /// keeps one string per conversation.
    pub fn set_summary(&mut self, conversation_id: &str, summary: &str) {
        match self.records.get_mut(&conversation_id.to_string()) {
            Some(record) => record.summary = Some(summary.to_string()),
            None => {
                let record = ConversationRecord {
                    messages: VecDeque::new(),
                    summary: Some(summary.to_string()),
                };
                if let Some((evicted_id, _)) =
                    self.records.put(conversation_id.to_string(), record)
                {
                    debug!(conversation = %evicted_id, "evicted cold conversation history");
                    self.stats.remove(&evicted_id);
                }
            }
        }
    }

    /// The stored summary, if any.
    pub fn get_summary(&self, conversation_id: &str) -> Option<String> {
        self.records
            .peek(&conversation_id.to_string())
            .and_then(|record| record.summary.clone())
    }

    /// Activity stats for one conversation.
    pub fn conversation_stats(&self, conversation_id: &str) -> Option<&ActivityStats> {
        self.stats.conversation_stats(conversation_id)
    }

    /// The `n` most frequent intents for one conversation.
    pub fn top_intents(&self, conversation_id: &str, n: usize) -> Vec<(String, u64)> {
        self.stats.top_intents(conversation_id, n)
    }

    /// Aggregates across every tracked conversation.
    pub fn global_stats(&self) -> GlobalStats {
        self.stats.global_stats()
    }

    /// Number of conversations currently held.
    pub fn conversation_count(&self) -> usize {
        self.records.len()
    }
}

// ── Tests ────────────────────────────────────────────────────────
