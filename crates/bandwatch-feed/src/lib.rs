//! Tick source boundary.
//!
//! The price feed itself is an external collaborator; this crate owns
//! the contract it must satisfy (`TickSource`) and the supervision
//! around it: a liveness watchdog and an exponential-backoff reconnect
//! policy that together guarantee the engine only ever sees a live,
//! ordered stream.

pub mod error;
pub mod source;
pub mod watchdog;

pub use error::{FeedError, FeedResult};
pub use source::{ReplayTickSource, Tick, TickSource};
pub use watchdog::{FeedSupervisor, WatchdogConfig};
