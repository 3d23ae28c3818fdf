//! Bounded conversation memory for Threadkeeper.
//!
//! Everything the assistant remembers between messages lives here, and
//! everything is bounded: an unbounded number of distinct conversations
//! and users must never grow the process past a fixed footprint. The
//! single eviction primitive is the [`lru::LruCache`]; every store in
//! this module wraps one instead of keeping its own trimming loops.
//!
//! ## Stores
//!
//! - [`history::ConversationHistoryStore`] — per-conversation message
//!   FIFO (`max_history` deep) inside a conversation-level LRU
//!   (`max_conversations` wide). Owns the activity-stats lifecycle:
//!   evicting a conversation drops its stats too.
//! - [`names::NameResolutionCache`] — participant id → display name,
//!   LRU with a one-hour TTL, filled by an ordered strategy chain over
//!   a pluggable [`names::NameLookup`] collaborator.
//! - [`stats::ActivityStatisticsTracker`] — message counts, distinct
//!   participants, and intent frequencies per conversation.
//! - [`prefs::PreferenceStore`] — per-user learned preferences, merged
//!   from partial signals, bounded FIFO lists inside a user-level LRU.
//!
//! ## Concurrency
//!
//! All stores mutate synchronously on the event-processing path and
//! never suspend internally (the name cache awaits only its injected
//! collaborator). They assume one event handled at a time; callers on a
//! parallel runtime wrap each store in a `tokio::sync::Mutex`, which is
//! what the binary does.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use threadkeeper::memory::history::ConversationHistoryStore;
//! use threadkeeper::memory::names::{NameResolutionCache, NoLookup};
//! use threadkeeper::memory::prefs::{PreferenceStore, PreferenceSignal};
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let mut history = ConversationHistoryStore::new(500, 10, 10);
//! let mut names = NameResolutionCache::new(
//!     1000,
//!     chrono::Duration::hours(1),
//!     Arc::new(NoLookup),
//! );
//! let mut prefs = PreferenceStore::new(500);
//!
//! let sender = names.resolve_name("1000123", Some("Alice"), Some("t1")).await;
//! history.append_message("t1", &sender, "what's the weather like?", Some("weather"));
//! prefs.merge_preference(
//!     "1000123",
//!     &PreferenceSignal { topic: Some("weather".into()), ..Default::default() },
//! );
//!
//! let prompt_context = history.get_formatted_history("t1", None);
//! # let _ = prompt_context;
//! # }
//! ```

pub mod history;
pub mod lru;
pub mod names;
pub mod prefs;
pub mod stats;
