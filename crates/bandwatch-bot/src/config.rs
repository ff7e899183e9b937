//! Application configuration.

use bandwatch_feed::WatchdogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Tick feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Watchdog and reconnect policy.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Price replay file (one price per line). The live feed connector
    /// is provided by the hosting deployment; replay is what the
    /// standalone binary runs on.
    #[serde(default)]
    pub replay_path: Option<String>,
    /// Pacing between replayed ticks (ms).
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
    /// Bounded tick channel capacity between supervisor and engine.
    #[serde(default = "default_tick_buffer")]
    pub tick_buffer: usize,
}

fn default_replay_interval_ms() -> u64 {
    100
}

fn default_tick_buffer() -> usize {
    1024
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            watchdog: WatchdogConfig::default(),
            replay_path: None,
            replay_interval_ms: default_replay_interval_ms(),
            tick_buffer: default_tick_buffer(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of publish channel slots activated signals spread over.
    #[serde(default = "default_channel_pool_size")]
    pub channel_pool_size: u32,
    /// Maximum armed alarms per user.
    #[serde(default = "default_max_alarms_per_user")]
    pub max_alarms_per_user: usize,
    /// Bounded event channel capacity towards the dispatcher.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_channel_pool_size() -> u32 {
    4
}

fn default_max_alarms_per_user() -> usize {
    5
}

fn default_event_buffer() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_pool_size: default_channel_pool_size(),
            max_alarms_per_user: default_max_alarms_per_user(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of human-readable output.
    #[serde(default)]
    pub json_logs: bool,
    /// Filter applied when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info,bandwatch=debug".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_filter: default_log_filter(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Append-only JSON-lines event journal.
    pub journal_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            journal_path: "./data/events.jsonl".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("BANDWATCH_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }
}
