//! Periodic reminder scheduler.
//!
//! One background task scans the [`ReminderStore`] on a fixed interval
//! (default 30 s) and drives each reminder through its state machine:
//!
//! ```text
//! Scheduled ──(15 min before fire, if the lead window ever opened)──▶ PreNotified
//!     │                                                                   │
//!     └──────────────(now >= fire time)──────────────┬────────────────────┘
//!                                                    ▼
//!                                             Fired (removed)
//! ```
//!
//! The pre-notification is opportunistic: a reminder created with less
//! than 15 minutes of lead skips straight to the final fire. Delivery
//! goes through the injected [`NotificationDispatcher`]; a failed
//! dispatch is logged and the state transition is *not* applied, so the
//! same reminder retries next tick — at-least-once for the final
//! notification, at-most-one successful heads-up (guarded by the
//! persisted flag).
//!
//! Ticks never overlap: the loop awaits each scan before sleeping
//! again, and a missed deadline delays rather than bursts. `stop()` is
//! clean — an in-flight tick finishes, no new tick starts.

use crate::reminder::store::{ReminderStore, PRE_REMINDER_LEAD_MINUTES};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default scan interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

// ── Dispatcher contract ──────────────────────────────────────────

/// External collaborator that actually delivers a message into a
/// conversation. The core only requires that failure be distinguishable
/// from success so the scheduler can decide whether to advance state.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn deliver(
        &self,
        thread_id: &str,
        user_name: &str,
        user_id: &str,
        text: &str,
    ) -> anyhow::Result<()>;
}

// ── ReminderScheduler ────────────────────────────────────────────

/// Scans the store on a timer and dispatches due notifications.
pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    tick_interval: Duration,
}

/// Handle for a running scheduler task. Dropping it does not stop the
/// task; call [`stop`](SchedulerHandle::stop).
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request a clean stop and wait for the in-flight tick to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task did not shut down cleanly");
        }
    }
}

impl ReminderScheduler {
    pub fn new(store: Arc<ReminderStore>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Override the scan interval (default 30 s).
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Spawn the periodic task. One scheduler instance per process —
    /// two schedulers over the same file would double-fire.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let tick_interval = self.tick_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            // A tick that overruns delays the next one instead of bursting
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(interval_secs = tick_interval.as_secs(), "reminder scheduler started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_tick(Utc::now()).await;
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            info!("reminder scheduler stopping");
                            break;
                        }
                    }
                }
            }
        });

        SchedulerHandle { stop_tx, task }
    }

    /// One scan: deliver due heads-ups and final notifications.
    ///
    /// Public with an explicit clock so the exact firing semantics are
    /// testable without a running timer.
    pub async fn run_tick(&self, now: DateTime<Utc>) {
        let lead = ChronoDuration::minutes(PRE_REMINDER_LEAD_MINUTES);

        for reminder in self.store.list_all().await {
            // Final notification first: a reminder past its fire time is
            // due regardless of pre-notification state.
            if now >= reminder.reminder_time {
                let text = format!(
                    "⏰ Reminder for {}: {}",
                    reminder.user_name, reminder.message
                );
                match self
                    .dispatcher
                    .deliver(&reminder.thread_id, &reminder.user_name, &reminder.user_id, &text)
                    .await
                {
                    Ok(()) => {
                        debug!(id = %reminder.id, "reminder fired");
                        self.store.mark_notified_and_remove(&reminder.id).await;
                    }
                    Err(e) => {
                        // Retry on the next tick
                        warn!(id = %reminder.id, error = %e, "reminder dispatch failed");
                    }
                }
                continue;
            }

            // Heads-up: only inside the lead window, and only when that
            // window opened after the reminder was created (otherwise a
            // short-lead reminder would be pre-notified immediately).
            let window_start = reminder.reminder_time - lead;
            if !reminder.pre_reminder_sent && now >= window_start && window_start > reminder.created_at
            {
                let text = format!(
                    "🔔 Heads up, {}: in {} minutes — {}",
                    reminder.user_name, PRE_REMINDER_LEAD_MINUTES, reminder.message
                );
                match self
                    .dispatcher
                    .deliver(&reminder.thread_id, &reminder.user_name, &reminder.user_id, &text)
                    .await
                {
                    Ok(()) => {
                        debug!(id = %reminder.id, "pre-reminder sent");
                        self.store.mark_pre_notified(&reminder.id).await;
                    }
                    Err(e) => {
                        warn!(id = %reminder.id, error = %e, "pre-reminder dispatch failed");
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    /// Dispatcher double that records deliveries and can be told to fail.
    struct RecordingDispatcher {
        delivered: Mutex<Vec<(String, String)>>,
        fail: AtomicBool,
    }

    impl RecordingDispatcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        async fn texts(&self) -> Vec<String> {
            self.delivered.lock().await.iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn deliver(
            &self,
            thread_id: &str,
            _user_name: &str,
            _user_id: &str,
            text: &str,
        ) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("transport down");
            }
            self.delivered
                .lock()
                .await
                .push((thread_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    async fn setup() -> (TempDir, Arc<ReminderStore>, Arc<RecordingDispatcher>, ReminderScheduler)
    {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(ReminderStore::new(tmp.path().join("reminders.json")));
        let dispatcher = RecordingDispatcher::new();
        let scheduler = ReminderScheduler::new(store.clone(), dispatcher.clone());
        (tmp, store, dispatcher, scheduler)
    }

    #[tokio::test]
    async fn final_notification_fires_exactly_once() {
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        let fire = base() + ChronoDuration::minutes(30);
        store
            .create_at("u1", "Alice", "t1", "submit report", fire, base())
            .await
            .unwrap();

        // Ticks before the fire time never dispatch the final message
        for min in [0, 10, 29] {
            scheduler.run_tick(base() + ChronoDuration::minutes(min)).await;
        }
        let finals = dispatcher
            .texts()
            .await
            .iter()
            .filter(|t| t.contains("⏰"))
            .count();
        assert_eq!(finals, 0);

        // One tick at/after the fire time dispatches and removes
        scheduler.run_tick(fire + ChronoDuration::seconds(5)).await;
        assert!(store.is_empty().await);

        // Further ticks find nothing
        scheduler.run_tick(fire + ChronoDuration::minutes(5)).await;
        let finals = dispatcher
            .texts()
            .await
            .iter()
            .filter(|t| t.contains("submit report") && t.contains("⏰"))
            .count();
        assert_eq!(finals, 1);
    }

    #[tokio::test]
    async fn pre_notification_fires_inside_lead_window() {
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        let fire = base() + ChronoDuration::minutes(30);
        store
            .create_at("u1", "Alice", "t1", "submit report", fire, base())
            .await
            .unwrap();

        // 10:14 — before the window opens at 10:15
        scheduler.run_tick(base() + ChronoDuration::minutes(14)).await;
        assert!(dispatcher.texts().await.is_empty());

        // 10:15 — heads-up goes out
        scheduler.run_tick(base() + ChronoDuration::minutes(15)).await;
        let texts = dispatcher.texts().await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Heads up"));

        // Flag guards against a second heads-up
        scheduler.run_tick(base() + ChronoDuration::minutes(20)).await;
        assert_eq!(dispatcher.texts().await.len(), 1);

        let list = store.list_by_owner("u1").await;
        assert!(list[0].pre_reminder_sent);
    }

    #[tokio::test]
    async fn short_lead_reminder_skips_pre_notification() {
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        // 5 minutes of lead: the 15-minute window opened before creation
        let fire = base() + ChronoDuration::minutes(5);
        store
            .create_at("u1", "Alice", "t1", "quick", fire, base())
            .await
            .unwrap();

        scheduler.run_tick(base() + ChronoDuration::minutes(1)).await;
        scheduler.run_tick(base() + ChronoDuration::minutes(4)).await;
        assert!(dispatcher.texts().await.is_empty());

        scheduler.run_tick(fire).await;
        let texts = dispatcher.texts().await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("⏰"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn failed_dispatch_retries_next_tick() {
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        let fire = base() + ChronoDuration::minutes(30);
        let (reminder, _) = store
            .create_at("u1", "Alice", "t1", "flaky", fire, base())
            .await
            .unwrap();

        // Transport down at fire time: flag untouched, record kept
        dispatcher.fail.store(true, Ordering::SeqCst);
        scheduler.run_tick(fire).await;
        assert_eq!(store.len().await, 1);
        assert!(!store.list_by_owner("u1").await[0].reminder_sent);

        // Transport back: the same reminder fires and is removed
        dispatcher.fail.store(false, Ordering::SeqCst);
        scheduler.run_tick(fire + ChronoDuration::minutes(1)).await;
        assert!(store.is_empty().await);

        let texts = dispatcher.texts().await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("flaky"));
        let _ = reminder;
    }

    #[tokio::test]
    async fn failed_pre_dispatch_retries_then_sends_once() {
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        let fire = base() + ChronoDuration::minutes(30);
        store
            .create_at("u1", "Alice", "t1", "x", fire, base())
            .await
            .unwrap();

        dispatcher.fail.store(true, Ordering::SeqCst);
        scheduler.run_tick(base() + ChronoDuration::minutes(16)).await;
        assert!(!store.list_by_owner("u1").await[0].pre_reminder_sent);

        dispatcher.fail.store(false, Ordering::SeqCst);
        scheduler.run_tick(base() + ChronoDuration::minutes(17)).await;
        assert!(store.list_by_owner("u1").await[0].pre_reminder_sent);
        assert_eq!(dispatcher.texts().await.len(), 1);
    }

    #[tokio::test]
    async fn pre_notified_reminder_still_fires() {
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        let fire = base() + ChronoDuration::minutes(30);
        store
            .create_at("u1", "Alice", "t1", "both", fire, base())
            .await
            .unwrap();

        scheduler.run_tick(base() + ChronoDuration::minutes(16)).await;
        scheduler.run_tick(fire + ChronoDuration::seconds(1)).await;

        let texts = dispatcher.texts().await;
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Heads up"));
        assert!(texts[1].contains("⏰"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn spec_scenario_submit_report() {
        // create "submit report" at 10:00 firing 10:30; heads-up at
        // 10:15, final at 10:30:05, then the owner's list is empty
        let (_tmp, store, dispatcher, scheduler) = setup().await;
        let fire = Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap();
        let (_, has_pre) = store
            .create_at("u1", "Alice", "t1", "submit report", fire, base())
            .await
            .unwrap();
        assert!(has_pre);

        scheduler
            .run_tick(Utc.with_ymd_and_hms(2024, 1, 1, 10, 15, 0).unwrap())
            .await;
        assert!(store.list_by_owner("u1").await[0].pre_reminder_sent);

        scheduler
            .run_tick(Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 5).unwrap())
            .await;
        assert!(store.list_by_owner("u1").await.is_empty());
        assert_eq!(dispatcher.texts().await.len(), 2);
    }

    #[tokio::test]
    async fn start_and_stop_are_clean() {
        let (_tmp, store, dispatcher, _) = setup().await;
        let scheduler = ReminderScheduler::new(store.clone(), dispatcher.clone())
            .with_tick_interval(Duration::from_millis(10));

        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;
        // No panic, no hang — nothing was due, nothing delivered
        assert!(dispatcher.texts().await.is_empty());
    }
}
