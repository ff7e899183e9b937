//! Price-ordered alarm store.
//!
//! Holds `(user, target price)` watches and consumes every watch whose
//! target lies inside a tick's movement interval, exactly once.

pub mod error;
pub mod store;

pub use error::{AlarmError, AlarmResult};
pub use store::{AlarmFired, AlarmStore};
