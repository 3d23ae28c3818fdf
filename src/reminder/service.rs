//! Command-facing reminder API.
//!
//! The natural-language command layer (out of scope here) talks to this
//! facade instead of the store and scheduler directly: parse the user's
//! free text, create or list reminders, and manage the scheduler
//! lifecycle. Validation failures come back inside
//! [`CreateReminderResult`] with a user-facing message — the command
//! layer never sees an error type for bad input, only for I/O.

use crate::reminder::scheduler::{NotificationDispatcher, ReminderScheduler, SchedulerHandle};
use crate::reminder::store::{Reminder, ReminderStore};
use crate::reminder::timeparse::{parse_reminder_input, ParsedReminder};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

// ── Command result type ──────────────────────────────────────────

/// Outcome of a create-reminder command, shaped for direct rendering
/// by the command layer.
#[derive(Debug, Clone)]
pub struct CreateReminderResult {
    pub success: bool,
    /// The stored reminder, on success.
    pub reminder: Option<Reminder>,
    /// Human-readable reason, on failure.
    pub error: Option<String>,
    /// Whether a 15-minute heads-up will precede the final notification.
    pub has_pre_reminder: bool,
}

// ── ReminderService ──────────────────────────────────────────────

/// Facade over the store plus the scheduler lifecycle.
pub struct ReminderService {
    store: Arc<ReminderStore>,
    tick_interval: Duration,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl ReminderService {
    pub fn new(store: Arc<ReminderStore>, tick_interval: Duration) -> Self {
        Self {
            store,
            tick_interval,
            scheduler: Mutex::new(None),
        }
    }

    /// The underlying store (shared with the scheduler).
    pub fn store(&self) -> &Arc<ReminderStore> {
        &self.store
    }

    /// Split free text like "submit report in 30 minutes" into message
    /// and fire time. `None` when no time expression is found.
    pub fn parse_reminder_input(&self, text: &str) -> Option<ParsedReminder> {
        parse_reminder_input(text, Utc::now())
    }

    /// Create a reminder on behalf of a user.
    pub async fn create_reminder(
        &self,
        user_id: &str,
        user_name: &str,
        thread_id: &str,
        message: &str,
        fire_time: DateTime<Utc>,
    ) -> CreateReminderResult {
        match self
            .store
            .create(user_id, user_name, thread_id, message, fire_time)
            .await
        {
            Ok((reminder, has_pre_reminder)) => CreateReminderResult {
                success: true,
                reminder: Some(reminder),
                error: None,
                has_pre_reminder,
            },
            Err(e) => CreateReminderResult {
                success: false,
                reminder: None,
                error: Some(e.to_string()),
                has_pre_reminder: false,
            },
        }
    }

    /// A user's pending reminders, soonest first.
    pub async fn get_user_reminders(&self, user_id: &str) -> Vec<Reminder> {
        self.store.list_by_owner(user_id).await
    }

    /// Delete all of a user's reminders, returning how many there were.
    pub async fn clear_user_reminders(&self, user_id: &str) -> usize {
        self.store.delete_all_by_owner(user_id).await
    }

    /// Start the background scheduler with the given dispatcher.
    /// Idempotent — a second call while running is a logged no-op.
    pub async fn start_scheduler(&self, dispatcher: Arc<dyn NotificationDispatcher>) {
        let mut slot = self.scheduler.lock().await;
        if slot.is_some() {
            warn!("scheduler already running, ignoring start request");
            return;
        }
        let scheduler = ReminderScheduler::new(self.store.clone(), dispatcher)
            .with_tick_interval(self.tick_interval);
        *slot = Some(scheduler.start());
    }

    /// Stop the scheduler, letting any in-flight dispatch complete.
    /// A no-op when it isn't running.
    pub async fn stop_scheduler(&self) {
        let handle = self.scheduler.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
