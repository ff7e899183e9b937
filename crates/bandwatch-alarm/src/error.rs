//! Error types for bandwatch-alarm.

use bandwatch_core::Price;
use thiserror::Error;

/// Alarm store error types.
///
/// Cancellation of a missing alarm is not an error: the store reports it
/// as a definitive `false` because duplicate or late cancel requests are
/// expected traffic.
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("invalid target price: {0} (must be positive)")]
    InvalidTarget(Price),
}

/// Result type alias for alarm store operations.
pub type AlarmResult<T> = std::result::Result<T, AlarmError>;
