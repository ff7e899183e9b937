//! Structured logging initialization.

use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;
use crate::error::{AppError, AppResult};

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the
/// configured default. JSON output is a config switch so deployments
/// pick the format next to the rest of their settings.
pub fn init_logging(config: &TelemetryConfig) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    result.map_err(|e| AppError::Config(format!("failed to init logging: {e}")))
}
