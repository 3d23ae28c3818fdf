//! Runtime configuration for Threadkeeper.
//!
//! All knobs have sensible defaults; a JSON config file overrides them
//! field by field, and `THREADKEEPER_DATA_DIR` overrides the data
//! directory last. A missing config file is normal (defaults apply);
//! an unreadable one is an error so a typo'd path doesn't silently run
//! with defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "THREADKEEPER_DATA_DIR";

/// Tuning knobs for the memory layer and the reminder scheduler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Conversation-level LRU capacity.
    pub max_conversations: usize,
    /// Messages kept per conversation.
    pub max_history: usize,
    /// Default formatted-history length.
    pub context_window: usize,
    /// Name-cache capacity.
    pub max_names: usize,
    /// Name-cache entry TTL in seconds.
    pub name_ttl_secs: u64,
    /// Preference-store capacity (users).
    pub max_users: usize,
    /// Directory holding durable state (the reminder file).
    pub data_dir: PathBuf,
    /// Reminder file name inside `data_dir`.
    pub reminder_file: String,
    /// Scheduler scan interval in seconds.
    pub tick_interval_secs: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_conversations: 500,
            max_history: 10,
            context_window: 10,
            max_names: 1000,
            name_ttl_secs: 3600,
            max_users: 500,
            data_dir: PathBuf::from("data"),
            reminder_file: "reminders.json".to_string(),
            tick_interval_secs: 30,
        }
    }
}

impl CoreConfig {
    /// Load from a JSON file, falling back to defaults when the file
    /// doesn't exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("invalid config file: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides (currently just the data dir).
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }

    /// Full path of the reminder file.
    pub fn reminder_path(&self) -> PathBuf {
        self.data_dir.join(&self.reminder_file)
    }

    /// Name-cache TTL as a chrono duration.
    pub fn name_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.name_ttl_secs as i64)
    }

    /// Scheduler tick interval as a std duration.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let config = CoreConfig::default();
        assert_eq!(config.max_conversations, 500);
        assert_eq!(config.max_history, 10);
        assert_eq!(config.max_names, 1000);
        assert_eq!(config.name_ttl_secs, 3600);
        assert_eq!(config.tick_interval_secs, 30);
        assert!(config.reminder_path().ends_with("reminders.json"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = CoreConfig::load(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(config.max_history, CoreConfig::default().max_history);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"max_history": 25, "tick_interval_secs": 5}"#).unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.max_history, 25);
        assert_eq!(config.tick_interval_secs, 5);
        assert_eq!(config.max_conversations, 500);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CoreConfig::load(&path).is_err());
    }
}
