//! Error types for bandwatch-feed.

use thiserror::Error;

/// Feed supervision error types.
///
/// A stalled or disconnected subscription is not an error at this
/// boundary: the supervisor replaces the subscription and only fails
/// once the reconnect budget is spent.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Reconnect budget spent without a live stream.
    #[error("tick source unreachable after {0} reconnect attempts")]
    ReconnectsExhausted(u32),

    /// Source-specific connection failure.
    #[error("tick source connect failed: {0}")]
    Connect(String),
}

/// Result type alias for feed operations.
pub type FeedResult<T> = std::result::Result<T, FeedError>;
