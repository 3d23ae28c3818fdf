//! Threadkeeper standalone binary.
//!
//! Wires the memory stores and the reminder scheduler together with a
//! log-only dispatcher. A real deployment embeds the library and
//! injects its platform's directory lookup and message transport; this
//! binary exists to exercise the full init/run/teardown lifecycle.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use threadkeeper::config::CoreConfig;
use threadkeeper::memory::history::ConversationHistoryStore;
use threadkeeper::memory::names::{NameResolutionCache, NoLookup};
use threadkeeper::memory::prefs::PreferenceStore;
use threadkeeper::reminder::scheduler::NotificationDispatcher;
use threadkeeper::reminder::service::ReminderService;
use threadkeeper::reminder::store::ReminderStore;
use tokio::sync::Mutex;
use tracing::info;

/// Dispatcher that logs instead of delivering — standalone mode only.
struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn deliver(
        &self,
        thread_id: &str,
        user_name: &str,
        _user_id: &str,
        text: &str,
    ) -> Result<()> {
        info!(thread = %thread_id, user = %user_name, "would deliver: {text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadkeeper=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("threadkeeper.json"));
    let config = CoreConfig::load(&config_path)?;
    info!(data_dir = %config.data_dir.display(), "starting threadkeeper core");

    // Memory layer: explicit stores, handed by reference to whatever
    // event pipeline embeds this core
    let history = Arc::new(Mutex::new(ConversationHistoryStore::new(
        config.max_conversations,
        config.max_history,
        config.context_window,
    )));
    let names = Arc::new(Mutex::new(NameResolutionCache::new(
        config.max_names,
        config.name_ttl(),
        Arc::new(NoLookup),
    )));
    let prefs = Arc::new(Mutex::new(PreferenceStore::new(config.max_users)));

    // Reminder layer: load durable state, then start the scheduler
    let store = Arc::new(ReminderStore::new(config.reminder_path()));
    let loaded = store.load().await;
    info!(count = loaded, path = %store.path().display(), "loaded reminders");

    let service = ReminderService::new(store, config.tick_interval());
    service.start_scheduler(Arc::new(LogDispatcher)).await;

    info!(
        started_at = %Utc::now().to_rfc3339(),
        "threadkeeper running, press ctrl-c to stop"
    );
    tokio::signal::ctrl_c().await?;

    // Teardown: stop the scheduler cleanly; the memory stores are
    // process-local and need no flush
    service.stop_scheduler().await;

    let stats = history.lock().await.global_stats();
    info!(
        conversations = stats.conversations,
        messages = stats.total_messages,
        cached_names = names.lock().await.len(),
        preference_records = prefs.lock().await.len(),
        "memory layer at shutdown"
    );
    info!("threadkeeper stopped");

    Ok(())
}
