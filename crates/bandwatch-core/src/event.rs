//! Outbound event contract.
//!
//! Events are emitted at most once per causing crossing and consumed by
//! the notification dispatcher and the journal. Rendering and transport
//! are out of scope; only the payload contract lives here.

use crate::ids::{ChannelId, SignalId, UserId};
use crate::price::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event emitted by the crossing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A pending signal entered the market.
    SignalActivated {
        signal_id: SignalId,
        /// Publish slot assigned from the channel pool, if the signal
        /// is publishable.
        assigned_channel: Option<ChannelId>,
    },

    /// An active signal hit take-profit, stop-loss or its risk-free
    /// break-even level.
    SignalClosed {
        signal_id: SignalId,
        closed_price: Price,
        pip: Decimal,
        score: Decimal,
    },

    /// A pending signal was canceled by its owner.
    SignalCanceled { signal_id: SignalId },

    /// An armed alarm was consumed by a crossing.
    AlarmFired { user_id: UserId, target_price: Price },
}

impl EngineEvent {
    /// Short tag for log lines and journal filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignalActivated { .. } => "signal_activated",
            Self::SignalClosed { .. } => "signal_closed",
            Self::SignalCanceled { .. } => "signal_canceled",
            Self::AlarmFired { .. } => "alarm_fired",
        }
    }
}
