//! Trading signal lifecycle engine.
//!
//! Owns the Pending/Active/Closed/Canceled state machine, the pip and
//! score formulas, and the distribution of activated signals across a
//! fixed pool of publish channels.

pub mod channels;
pub mod engine;
pub mod error;
pub mod scoring;
pub mod signal;

pub use channels::ChannelPool;
pub use engine::SignalEngine;
pub use error::{SignalError, SignalResult};
pub use scoring::{score_closed, SignalOutcome};
pub use signal::{Signal, SignalDraft, SignalKind, SignalStatus};
