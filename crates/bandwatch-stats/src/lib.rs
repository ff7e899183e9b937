//! Per-user aggregate statistics.

pub mod aggregator;

pub use aggregator::{StatsAggregator, UserStats};
