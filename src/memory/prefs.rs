//! Per-user learned preferences.
//!
//! Conversations leak small signals about each user — a topic they keep
//! returning to, a language switch, a favorite artist. The command layer
//! turns those into [`PreferenceSignal`]s and this store folds them into
//! one bounded [`Preference`] record per user: list fields are FIFO with
//! a fixed cap and case-insensitive dedup, scalar fields are
//! last-write-wins. Records are merged, never replaced wholesale.
//!
//! The store itself is an LRU keyed by user id, so an unbounded user
//! population can't grow it past `max_users`.

use crate::memory::lru::LruCache;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::debug;

/// Caps on the list-valued preference fields.
pub const MAX_TOPICS: usize = 10;
pub const MAX_GENRES: usize = 5;
pub const MAX_ARTISTS: usize = 10;

// ── Preference types ─────────────────────────────────────────────

/// Everything learned about one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    /// Topics the user keeps coming back to (FIFO, max 10).
    pub favorite_topics: VecDeque<String>,
    /// Preferred language, if observed.
    pub language: Option<String>,
    /// Communication style ("formal", "playful", ...), if observed.
    pub style: Option<String>,
    /// Music genres (FIFO, max 5).
    pub music_genres: VecDeque<String>,
    /// Music artists (FIFO, max 10).
    pub music_artists: VecDeque<String>,
    /// When the last signal for this user arrived.
    pub last_interaction: DateTime<Utc>,
}

impl Preference {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            favorite_topics: VecDeque::new(),
            language: None,
            style: None,
            music_genres: VecDeque::new(),
            music_artists: VecDeque::new(),
            last_interaction: now,
        }
    }
}

/// A partial observation about a user. Any subset of fields may be set;
/// a signal with none set is a no-op.
#[derive(Debug, Clone, Default)]
pub struct PreferenceSignal {
    pub topic: Option<String>,
    pub language: Option<String>,
    pub style: Option<String>,
    pub genre: Option<String>,
    pub artist: Option<String>,
}

impl PreferenceSignal {
    /// Whether the signal carries any recognized field.
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.language.is_none()
            && self.style.is_none()
            && self.genre.is_none()
            && self.artist.is_none()
    }
}

// ── PreferenceStore ──────────────────────────────────────────────

/// Bounded per-user preference records.
pub struct PreferenceStore {
    records: LruCache<String, Preference>,
}

impl PreferenceStore {
    /// Create a store holding at most `max_users` records.
    pub fn new(max_users: usize) -> Self {
        Self {
            records: LruCache::new(max_users),
        }
    }

    /// Fold a signal into the user's record, creating it on the first
    /// observed signal. Empty signals change nothing and create nothing.
    pub fn merge_preference(&mut self, user_id: &str, signal: &PreferenceSignal) {
        self.merge_preference_at(user_id, signal, Utc::now());
    }

    /// [`merge_preference`](Self::merge_preference) with an explicit clock.
    pub fn merge_preference_at(
        &mut self,
        user_id: &str,
        signal: &PreferenceSignal,
        now: DateTime<Utc>,
    ) {
        if signal.is_empty() {
            return;
        }

        let key = user_id.to_string();
        if !self.records.contains(&key) {
            if let Some((evicted, _)) = self.records.put(key.clone(), Preference::new(now)) {
                debug!(user = %evicted, "evicted cold preference record");
            }
        }
        // Just inserted or already present
        let Some(record) = self.records.get_mut(&key) else {
            return;
        };

        if let Some(topic) = &signal.topic {
            push_bounded(&mut record.favorite_topics, topic, MAX_TOPICS);
        }
        if let Some(language) = &signal.language {
            record.language = Some(language.clone());
        }
        if let Some(style) = &signal.style {
            record.style = Some(style.clone());
        }
        if let Some(genre) = &signal.genre {
            push_bounded(&mut record.music_genres, genre, MAX_GENRES);
        }
        if let Some(artist) = &signal.artist {
            push_bounded(&mut record.music_artists, artist, MAX_ARTISTS);
        }
        record.last_interaction = now;
    }

    /// The user's record, if any signals have been observed.
    pub fn get_preference(&self, user_id: &str) -> Option<&Preference> {
        self.records.peek(&user_id.to_string())
    }

    /// Prompt-ready lines describing the user's preferences, or `None`
    /// when nothing is known.
    pub fn formatted_preference_context(&self, user_id: &str) -> Option<String> {
        let record = self.records.peek(&user_id.to_string())?;
        let mut lines = Vec::new();

        if !record.favorite_topics.is_empty() {
            lines.push(format!(
                "Favorite topics: {}",
                join(&record.favorite_topics)
            ));
        }
        if let Some(language) = &record.language {
            lines.push(format!("Preferred language: {language}"));
        }
        if let Some(style) = &record.style {
            lines.push(format!("Communication style: {style}"));
        }
        if !record.music_genres.is_empty() {
            lines.push(format!("Music genres: {}", join(&record.music_genres)));
        }
        if !record.music_artists.is_empty() {
            lines.push(format!("Music artists: {}", join(&record.music_artists)));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Number of users with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// FIFO insert with a cap and case-insensitive dedup.
fn push_bounded(list: &mut VecDeque<String>, value: &str, max: usize) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let lowered = value.to_lowercase();
    if list.iter().any(|existing| existing.to_lowercase() == lowered) {
        return;
    }
    list.push_back(value.to_string());
    while list.len() > max {
        list.pop_front();
    }
}

fn join(list: &VecDeque<String>) -> String {
    list.iter().cloned().collect::<Vec<_>>().join(", ")
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, min, 0).unwrap()
    }

    fn topic(t: &str) -> PreferenceSignal {
        PreferenceSignal {
            topic: Some(t.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn first_signal_creates_a_record() {
        let mut store = PreferenceStore::new(10);
        store.merge_preference_at("u1", &topic("astronomy"), at(0));

        let pref = store.get_preference("u1").unwrap();
        assert_eq!(pref.favorite_topics.len(), 1);
        assert_eq!(pref.favorite_topics[0], "astronomy");
        assert_eq!(pref.last_interaction, at(0));
    }

    #[test]
    fn merging_same_topic_twice_keeps_one_entry() {
        let mut store = PreferenceStore::new(10);
        store.merge_preference_at("u1", &topic("astronomy"), at(0));
        store.merge_preference_at("u1", &topic("Astronomy"), at(1));

        let pref = store.get_preference("u1").unwrap();
        assert_eq!(pref.favorite_topics.len(), 1);
    }

    #[test]
    fn empty_signal_is_a_no_op() {
        let mut store = PreferenceStore::new(10);
        store.merge_preference_at("u1", &PreferenceSignal::default(), at(0));
        assert!(store.get_preference("u1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn scalar_fields_are_last_write_wins() {
        let mut store = PreferenceStore::new(10);
        store.merge_preference_at(
            "u1",
            &PreferenceSignal {
                language: Some("en".to_string()),
                style: Some("formal".to_string()),
                ..Default::default()
            },
            at(0),
        );
        store.merge_preference_at(
            "u1",
            &PreferenceSignal {
                language: Some("vi".to_string()),
                ..Default::default()
            },
            at(1),
        );

        let pref = store.get_preference("u1").unwrap();
        assert_eq!(pref.language.as_deref(), Some("vi"));
        // Untouched scalar keeps its value — merge, not replace
        assert_eq!(pref.style.as_deref(), Some("formal"));
    }

    #[test]
    fn topics_are_fifo_bounded() {
        let mut store = PreferenceStore::new(10);
        for i in 0..15 {
            store.merge_preference_at("u1", &topic(&format!("topic-{i}")), at(i));
        }

        let pref = store.get_preference("u1").unwrap();
        assert_eq!(pref.favorite_topics.len(), MAX_TOPICS);
        assert_eq!(pref.favorite_topics[0], "topic-5");
        assert_eq!(pref.favorite_topics[MAX_TOPICS - 1], "topic-14");
    }

    #[test]
    fn genres_cap_at_five() {
        let mut store = PreferenceStore::new(10);
        for i in 0..8 {
            store.merge_preference_at(
                "u1",
                &PreferenceSignal {
                    genre: Some(format!("genre-{i}")),
                    ..Default::default()
                },
                at(i),
            );
        }
        assert_eq!(store.get_preference("u1").unwrap().music_genres.len(), MAX_GENRES);
    }

    #[test]
    fn store_is_bounded_by_user_count() {
        let mut store = PreferenceStore::new(3);
        for i in 0..10 {
            store.merge_preference_at(&format!("u{i}"), &topic("reading"), at(i));
        }
        assert_eq!(store.len(), 3);
        // The most recent users survive
        assert!(store.get_preference("u9").is_some());
        assert!(store.get_preference("u0").is_none());
    }

    #[test]
    fn formatted_context_lists_known_fields() {
        let mut store = PreferenceStore::new(10);
        store.merge_preference_at(
            "u1",
            &PreferenceSignal {
                topic: Some("hiking".to_string()),
                language: Some("en".to_string()),
                artist: Some("Ludovico Einaudi".to_string()),
                ..Default::default()
            },
            at(0),
        );

        let context = store.formatted_preference_context("u1").unwrap();
        assert!(context.contains("Favorite topics: hiking"));
        assert!(context.contains("Preferred language: en"));
        assert!(context.contains("Ludovico Einaudi"));
        assert!(!context.contains("Music genres"));
    }

    #[test]
    fn formatted_context_none_for_unknown_user() {
        let store = PreferenceStore::new(10);
        assert!(store.formatted_preference_context("ghost").is_none());
    }
}
