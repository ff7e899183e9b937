//! Core domain types for the bandwatch crossing engine.
//!
//! This crate provides the fundamental vocabulary shared by every other
//! crate in the workspace:
//! - `Price`: precision-safe price type
//! - `UserId`, `SignalId`, `ChannelId`: identity types
//! - `PriceObservation` and the `crossed` detector
//! - `EngineEvent`: the outbound event contract
//!
//! Errors live with the crates that produce them; this crate exposes
//! only infallible types.

pub mod event;
pub mod ids;
pub mod observation;
pub mod price;

pub use event::EngineEvent;
pub use ids::{ChannelId, SignalId, UserId};
pub use observation::{crossed, PriceObservation};
pub use price::Price;
