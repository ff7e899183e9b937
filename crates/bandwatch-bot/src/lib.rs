//! Bandwatch application crate.
//!
//! Wires the tick feed, the signal engine, the alarm store and the
//! stats aggregator behind a single-writer actor, and exposes the
//! command surface consumed by user-facing layers.

pub mod app;
pub mod config;
pub mod error;
pub mod journal;
pub mod logging;

pub use app::{CoreHandle, CoreService};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use journal::EventJournal;
pub use logging::init_logging;
