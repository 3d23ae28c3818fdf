//! Display-name resolution with a bounded, TTL'd cache.
//!
//! Maps participant ids to display names so the assistant can address
//! people without hammering the external directory. Resolution walks a
//! fixed strategy order — first success wins and is cached:
//!
//! 1. **Event hint** — a name supplied by the triggering event (free).
//! 2. **Cache** — LRU hit, subject to a one-hour TTL.
//! 3. **Directory** — single-participant lookup via the injected
//!    [`NameLookup`] collaborator.
//! 4. **Participant list** — conversation-scoped lookup, same collaborator.
//! 5. **Fallback** — the id itself, stringified. The fallback is cached
//!    too, so repeated failures don't repeat network attempts inside the
//!    TTL window.
//!
//! Collaborator failures are swallowed with a warning and fall through
//! to the next strategy — name resolution is best-effort enrichment and
//! must never surface an error to the event path.

use crate::memory::lru::LruCache;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

// ── Collaborator contract ────────────────────────────────────────

/// External directory the cache consults when it has no answer.
///
/// All methods are best-effort: an `Err` is treated as "no information"
/// by the cache, never propagated. The default impls answer nothing, so
/// a transport only overrides what its platform actually supports.
#[async_trait]
pub trait NameLookup: Send + Sync {
    /// Look up one participant's display name.
    async fn lookup_name(&self, _participant_id: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Fetch all members of a conversation as the directory's raw JSON.
    ///
    /// The cache tolerates several response shapes — see
    /// [`NameResolutionCache::resolve_all_members`].
    async fn fetch_members(&self, _conversation_id: &str) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }

    /// Conversation-scoped `(id, name)` participant list.
    async fn participant_list(
        &self,
        _conversation_id: &str,
    ) -> anyhow::Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

/// A [`NameLookup`] that knows nothing. Useful standalone and in tests.
pub struct NoLookup;

#[async_trait]
impl NameLookup for NoLookup {}

// ── Cache internals ──────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CachedName {
    name: String,
    cached_at: DateTime<Utc>,
}

/// Resolution strategies, walked in order. Kept explicit so new
/// strategies slot in without touching the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    EventHint,
    Cache,
    Directory,
    ParticipantList,
    IdFallback,
}

const STRATEGY_ORDER: [Strategy; 5] = [
    Strategy::EventHint,
    Strategy::Cache,
    Strategy::Directory,
    Strategy::ParticipantList,
    Strategy::IdFallback,
];

// ── NameResolutionCache ──────────────────────────────────────────

/// Bounded participant-id → display-name cache with pluggable lookups.
pub struct NameResolutionCache {
    cache: LruCache<String, CachedName>,
    lookup: Arc<dyn NameLookup>,
    ttl: Duration,
}

impl NameResolutionCache {
    /// Create a cache of at most `max_names` entries with entries
    /// expiring after `ttl`.
    pub fn new(max_names: usize, ttl: Duration, lookup: Arc<dyn NameLookup>) -> Self {
        Self {
            cache: LruCache::new(max_names),
            lookup,
            ttl,
        }
    }

    /// Resolve a participant's display name. Never fails.
    pub async fn resolve_name(
        &mut self,
        participant_id: &str,
        event_hint: Option<&str>,
        conversation_id: Option<&str>,
    ) -> String {
        self.resolve_name_at(participant_id, event_hint, conversation_id, Utc::now())
            .await
    }

    /// [`resolve_name`](Self::resolve_name) with an explicit clock.
    pub async fn resolve_name_at(
        &mut self,
        participant_id: &str,
        event_hint: Option<&str>,
        conversation_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> String {
        for strategy in STRATEGY_ORDER {
            if let Some(name) = self
                .try_strategy(strategy, participant_id, event_hint, conversation_id, now)
                .await
            {
                // A cache hit already touched LRU recency in `cached()`;
                // re-storing it would reset `cached_at` and let a
                // frequently-read entry dodge its TTL forever.
                if strategy != Strategy::Cache {
                    self.store(participant_id, &name, now);
                }
                return name;
            }
        }
        // IdFallback always answers; unreachable, but keep the contract total.
        participant_id.to_string()
    }

    async fn try_strategy(
        &mut self,
        strategy: Strategy,
        participant_id: &str,
        event_hint: Option<&str>,
        conversation_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<String> {
        match strategy {
            Strategy::EventHint => event_hint
                .filter(|hint| !hint.trim().is_empty())
                .map(|hint| hint.trim().to_string()),

            Strategy::Cache => self.cached(participant_id, now),

            Strategy::Directory => match self.lookup.lookup_name(participant_id).await {
                Ok(name) => name.filter(|n| !n.trim().is_empty()),
                Err(e) => {
                    warn!(participant = %participant_id, error = %e, "directory lookup failed");
                    None
                }
            },

            Strategy::ParticipantList => {
                let conversation_id = conversation_id?;
                match self.lookup.participant_list(conversation_id).await {
                    Ok(list) => list
                        .into_iter()
                        .find(|(id, _)| id == participant_id)
                        .map(|(_, name)| name)
                        .filter(|n| !n.trim().is_empty()),
                    Err(e) => {
                        warn!(conversation = %conversation_id, error = %e,
                              "participant list lookup failed");
                        None
                    }
                }
            }

            Strategy::IdFallback => Some(participant_id.to_string()),
        }
    }

    /// Cache hit subject to TTL. An expired entry is removed and
    /// treated as a miss.
    fn cached(&mut self, participant_id: &str, now: DateTime<Utc>) -> Option<String> {
        let key = participant_id.to_string();
        let expired = match self.cache.peek(&key) {
            Some(entry) => now - entry.cached_at >= self.ttl,
            None => return None,
        };
        if expired {
            self.cache.remove(&key);
            return None;
        }
        self.cache.get(&key).map(|entry| entry.name.clone())
    }

    /// Insert a resolved name, evicting the coldest entry if full.
    fn store(&mut self, participant_id: &str, name: &str, now: DateTime<Utc>) {
        self.cache.put(
            participant_id.to_string(),
            CachedName {
                name: name.to_string(),
                cached_at: now,
            },
        );
    }

    /// Resolve every member of a conversation with one batched
    /// directory fetch, populating the cache for each.
    ///
    /// Tolerated response shapes:
    /// - array of records: `[{"id": "...", "name": "..."}]` (also
    ///   `userID`/`user_id` and `fullName`/`full_name` key spellings)
    /// - object keyed by id: `{"1000123": {"name": "..."}}` or
    ///   `{"1000123": "Name"}`
    /// - legacy participant list: `{"participantIDs": ["...", ...]}`,
    ///   resolved per-id through the normal strategy chain
    ///
    /// Ids must look numeric (all ASCII digits, 5–20 chars) to be
    /// accepted. A failed fetch yields an empty map.
    pub async fn resolve_all_members(
        &mut self,
        conversation_id: &str,
    ) -> HashMap<String, String> {
        self.resolve_all_members_at(conversation_id, Utc::now()).await
    }

    /// [`resolve_all_members`](Self::resolve_all_members) with an explicit clock.
    pub async fn resolve_all_members_at(
        &mut self,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> HashMap<String, String> {
        let raw = match self.lookup.fetch_members(conversation_id).await {
            Ok(value) => value,
            Err(e) => {
                warn!(conversation = %conversation_id, error = %e, "member fetch failed");
                return HashMap::new();
            }
        };

        let mut resolved = HashMap::new();

        match &raw {
            Value::Array(records) => {
                for record in records {
                    if let Some((id, name)) = member_from_record(record) {
                        resolved.insert(id, name);
                    }
                }
            }
            Value::Object(map) => {
                if let Some(Value::Array(ids)) = map.get("participantIDs") {
                    // Legacy shape: bare id list, resolve each individually
                    for id in ids.iter().filter_map(Value::as_str) {
                        if !is_numeric_id(id) {
                            continue;
                        }
                        let name = self.resolve_name_at(id, None, Some(conversation_id), now).await;
                        resolved.insert(id.to_string(), name);
                    }
                } else {
                    for (id, value) in map {
                        if !is_numeric_id(id) {
                            continue;
                        }
                        let name = match value {
                            Value::String(s) => Some(s.clone()),
                            Value::Object(_) => record_name(value),
                            _ => None,
                        };
                        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
                            resolved.insert(id.clone(), name);
                        }
                    }
                }
            }
            _ => {
                debug!(conversation = %conversation_id, "member fetch returned no usable shape");
            }
        }

        for (id, name) in &resolved {
            self.store(id, name, now);
        }

        resolved
    }

    /// Number of cached names.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

// ── Shape helpers ────────────────────────────────────────────────

/// Extract `(id, name)` from one member record, validating the id.
fn member_from_record(record: &Value) -> Option<(String, String)> {
    let id = ["id", "userID", "user_id"]
        .iter()
        .find_map(|key| record.get(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })?;

    if !is_numeric_id(&id) {
        return None;
    }

    let name = record_name(record)?;
    if name.trim().is_empty() {
        return None;
    }
    Some((id, name))
}

/// Pull a display name out of a record, tolerating key spellings.
fn record_name(record: &Value) -> Option<String> {
    ["name", "fullName", "full_name"]
        .iter()
        .find_map(|key| record.get(*key))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Platform ids are long digit strings; anything else is noise.
fn is_numeric_id(id: &str) -> bool {
    (5..=20).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit())
}

// ── Tests ────────────────────────────────────────────────────────
