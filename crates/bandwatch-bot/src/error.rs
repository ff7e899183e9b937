//! Application error types.

use bandwatch_alarm::AlarmError;
use bandwatch_core::UserId;
use bandwatch_signal::SignalError;
use thiserror::Error;

/// Application-level errors.
///
/// Feed failures never appear here: the supervisor owns reconnection
/// and reports through its own error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Alarm(#[from] AlarmError),

    /// Per-user armed alarm cap reached; caller fault, no retry.
    #[error("user {user} already holds {limit} armed alarms")]
    AlarmLimit { user: UserId, limit: usize },

    /// Journal sink unreachable; eligible for caller-driven retry.
    #[error("event journal unavailable: {0}")]
    JournalUnavailable(#[source] std::io::Error),

    /// The engine actor is gone; commands can no longer be served.
    #[error("engine unavailable")]
    EngineGone,
}

/// Result type alias for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
