//! Error types for bandwatch-signal.

use thiserror::Error;

/// Signal engine error types.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Malformed creation request; caller fault, no retry.
    #[error("invalid signal: {0}")]
    InvalidArgument(String),

    /// Corrupt state reached the engine (e.g. a band where the loss
    /// side coincides with the entry). Logged fatally, never repaired.
    #[error("signal invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type alias for signal operations.
pub type SignalResult<T> = std::result::Result<T, SignalError>;
