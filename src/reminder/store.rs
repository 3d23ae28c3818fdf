//! Durable reminder storage.
//!
//! All live reminders are kept in one flat JSON file — an object keyed
//! by reminder id — rewritten in full on every mutation. Writes go to a
//! temporary file first and are renamed over the target, so a crash
//! mid-write never leaves a truncated store behind. On load, a missing
//! or corrupt file degrades to an empty store with a warning; reminders
//! are low-stakes enough that losing the file must never block startup.
//!
//! Field names in the file match the legacy bot's format (`userID`,
//! `threadID`, `reminderTime`, ...) so an existing file loads unchanged.
//!
//! Two logical actors mutate the store: the command path (create /
//! delete) and the scheduler tick (flag flips). Both serialize through
//! the internal mutex, so every read-modify-persist is a single
//! critical section.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

/// Minutes of lead time before the fire time at which the heads-up
/// notification becomes possible.
pub const PRE_REMINDER_LEAD_MINUTES: i64 = 15;

/// Furthest a reminder may be scheduled ahead.
pub const MAX_DAYS_AHEAD: i64 = 30;

// ── Reminder record ──────────────────────────────────────────────

/// One scheduled reminder. Serialized field names match the legacy
/// flat-file format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    /// Unique, monotonic-ish identifier (millisecond timestamp string).
    pub id: String,
    /// Owner's user id.
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Owner's display name at creation time.
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Conversation the notification is delivered into.
    #[serde(rename = "threadID")]
    pub thread_id: String,
    /// What to say when the reminder fires.
    pub message: String,
    /// Absolute fire time.
    #[serde(rename = "reminderTime")]
    pub reminder_time: DateTime<Utc>,
    /// Whether the 15-minute heads-up has been delivered.
    #[serde(rename = "preReminderSent", default)]
    pub pre_reminder_sent: bool,
    /// Whether the final notification has been delivered. A record with
    /// this set is removed in the same step, so it never persists.
    #[serde(rename = "reminderSent", default)]
    pub reminder_sent: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Why a reminder could not be created. `Display` gives the exact text
/// surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("time must be in the future")]
    InPast,
    #[error("max 30 days ahead")]
    TooFarAhead,
}

// ── ReminderStore ────────────────────────────────────────────────

struct StoreInner {
    reminders: HashMap<String, Reminder>,
}

/// Durable collection of live reminders backed by one flat file.
pub struct ReminderStore {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl ReminderStore {
    /// Create a store persisting to `path`. Call [`load`](Self::load)
    /// before use to pick up existing reminders.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(StoreInner {
                reminders: HashMap::new(),
            }),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the backing file, replacing in-memory state. Idempotent:
    /// re-loading the same file reproduces the same store. Never fatal:
    /// a missing file is an empty store, and an unreadable or corrupt
    /// one degrades to empty with a logged warning — losing reminders
    /// must not block startup.
    pub async fn load(&self) -> usize {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e,
                          "reminder file unreadable, starting empty");
                }
                let mut inner = self.inner.lock().await;
                inner.reminders.clear();
                return 0;
            }
        };

        let reminders: HashMap<String, Reminder> = match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e,
                      "reminder file is corrupt, starting empty");
                HashMap::new()
            }
        };

        let mut inner = self.inner.lock().await;
        inner.reminders = reminders;
        inner.reminders.len()
    }

    /// Create a reminder firing at `reminder_time`.
    ///
    /// Returns the stored record plus whether there is enough lead time
    /// for a heads-up notification. Validation failures come back as
    /// [`CreateError`] values with user-facing messages; nothing is
    /// persisted on failure.
    pub async fn create(
        &self,
        user_id: &str,
        user_name: &str,
        thread_id: &str,
        message: &str,
        reminder_time: DateTime<Utc>,
    ) -> Result<(Reminder, bool), CreateError> {
        self.create_at(user_id, user_name, thread_id, message, reminder_time, Utc::now())
            .await
    }

    /// [`create`](Self::create) with an explicit clock.
    pub async fn create_at(
        &self,
        user_id: &str,
        user_name: &str,
        thread_id: &str,
        message: &str,
        reminder_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(Reminder, bool), CreateError> {
        if reminder_time <= now {
            return Err(CreateError::InPast);
        }
        if reminder_time > now + Duration::days(MAX_DAYS_AHEAD) {
            return Err(CreateError::TooFarAhead);
        }

        let mut inner = self.inner.lock().await;

        // Millisecond timestamp, bumped past any collision
        let mut id_num = now.timestamp_millis();
        while inner.reminders.contains_key(&id_num.to_string()) {
            id_num += 1;
        }
        let id = id_num.to_string();

        let reminder = Reminder {
            id: id.clone(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            thread_id: thread_id.to_string(),
            message: message.to_string(),
            reminder_time,
            pre_reminder_sent: false,
            reminder_sent: false,
            created_at: now,
        };

        inner.reminders.insert(id, reminder.clone());
        self.persist(&inner).await;

        let has_pre_reminder =
            reminder_time - Duration::minutes(PRE_REMINDER_LEAD_MINUTES) > now;
        Ok((reminder, has_pre_reminder))
    }

    /// Snapshot of one owner's reminders, soonest first.
    pub async fn list_by_owner(&self, user_id: &str) -> Vec<Reminder> {
        let inner = self.inner.lock().await;
        let mut list: Vec<Reminder> = inner
            .reminders
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|r| r.reminder_time);
        list
    }

    /// Snapshot of one conversation's reminders, soonest first.
    pub async fn list_by_conversation(&self, thread_id: &str) -> Vec<Reminder> {
        let inner = self.inner.lock().await;
        let mut list: Vec<Reminder> = inner
            .reminders
            .values()
            .filter(|r| r.thread_id == thread_id)
            .cloned()
            .collect();
        list.sort_by_key(|r| r.reminder_time);
        list
    }

    /// Snapshot of every live reminder (the scheduler's tick input).
    pub async fn list_all(&self) -> Vec<Reminder> {
        let inner = self.inner.lock().await;
        inner.reminders.values().cloned().collect()
    }

    /// Delete one reminder. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let existed = inner.reminders.remove(id).is_some();
        if existed {
            self.persist(&inner).await;
        }
        existed
    }

    /// Delete every reminder owned by `user_id`, returning the count.
    pub async fn delete_all_by_owner(&self, user_id: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.reminders.len();
        inner.reminders.retain(|_, r| r.user_id != user_id);
        let removed = before - inner.reminders.len();
        if removed > 0 {
            self.persist(&inner).await;
        }
        removed
    }

    /// Mark a reminder's heads-up as delivered. No-op for unknown ids.
    pub async fn mark_pre_notified(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(reminder) = inner.reminders.get_mut(id) {
            reminder.pre_reminder_sent = true;
            self.persist(&inner).await;
        }
    }

    /// Mark a reminder delivered and remove it in the same step, so no
    /// notified-but-present record ever persists.
    pub async fn mark_notified_and_remove(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        if inner.reminders.remove(id).is_some() {
            self.persist(&inner).await;
        }
    }

    /// Number of live reminders.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.reminders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.reminders.is_empty()
    }

    /// Rewrite the backing file: serialize, write to `<path>.tmp`, then
    /// rename over the target. A save failure is logged and the
    /// in-memory mutation stands — the next successful persist catches
    /// the file up.
    async fn persist(&self, inner: &StoreInner) {
        if let Err(e) = self.try_persist(inner).await {
            warn!(path = %self.path.display(), error = %e, "failed to persist reminders");
        }
    }

    async fn try_persist(&self, inner: &StoreInner) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(&inner.reminders)
            .context("failed to serialize reminders")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to rename into {}", self.path.display()))?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
