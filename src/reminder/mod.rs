//! Durable reminders for Threadkeeper.
//!
//! Users schedule time-triggered notifications ("submit report in 30
//! minutes"); this module makes sure each one fires exactly once at its
//! fire time — optionally preceded by a 15-minute heads-up — and that
//! nothing is lost across a process restart.
//!
//! ## Pieces
//!
//! - [`store::ReminderStore`] — the single source of durable state: a
//!   flat JSON file of live reminders, rewritten atomically on every
//!   mutation and reloaded at startup.
//! - [`timeparse`] — the small embedded grammar that turns "in 2 hours"
//!   or "2:30pm tomorrow" into an absolute fire time.
//! - [`scheduler::ReminderScheduler`] — the periodic task that scans
//!   the store and calls the injected
//!   [`scheduler::NotificationDispatcher`]; failed dispatches retry on
//!   the next tick.
//! - [`service::ReminderService`] — the facade the command layer uses:
//!   parse, create, list, clear, start/stop the scheduler.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use threadkeeper::reminder::service::ReminderService;
//! use threadkeeper::reminder::store::ReminderStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo(dispatcher: Arc<dyn threadkeeper::reminder::scheduler::NotificationDispatcher>) -> anyhow::Result<()> {
//! let store = Arc::new(ReminderStore::new("data/reminders.json"));
//! store.load().await;
//!
//! let service = ReminderService::new(store, Duration::from_secs(30));
//! service.start_scheduler(dispatcher).await;
//!
//! if let Some(parsed) = service.parse_reminder_input("submit report in 30 minutes") {
//!     let result = service
//!         .create_reminder("1000123", "Alice", "t1", &parsed.message, parsed.fire_time)
//!         .await;
//!     assert!(result.success);
//! }
//! # Ok(())
//! # }
//! ```

pub mod scheduler;
pub mod service;
pub mod store;
pub mod timeparse;
