//! Threadkeeper — assistant memory layer and durable reminder scheduler.
//!
//! The stateful core of a messaging-platform assistant. Everything
//! around it — the generative-text client, media and weather lookups,
//! text-to-speech, and the messaging transport itself — is orchestration
//! glue that lives elsewhere and plugs in through small collaborator
//! traits. What lives *here* is the part with real invariants:
//!
//! - **Bounded memory** ([`memory`]) — conversation history, display
//!   names, activity statistics, and learned user preferences, all kept
//!   behind fixed-capacity LRU caches so an unbounded number of
//!   conversations and users can never grow the process.
//! - **Durable reminders** ([`reminder`]) — user-created notifications
//!   that fire exactly once (plus an optional 15-minute heads-up),
//!   survive restarts via an atomically rewritten flat file, and retry
//!   failed deliveries on the next scheduler tick.
//!
//! Stores are explicit objects constructed once at startup and handed
//! to consumers — there is no global mutable state. The binary in
//! `main.rs` shows the full init/teardown lifecycle.
//!
//! ## Collaborator seams
//!
//! - [`memory::names::NameLookup`] — the external participant directory.
//! - [`reminder::scheduler::NotificationDispatcher`] — message delivery.
//!
//! Both are best-effort at the boundary: lookup failures fall through to
//! the next resolution strategy, delivery failures are retried, and
//! neither ever propagates as a crash.

pub mod config;
pub mod memory;
pub mod reminder;
