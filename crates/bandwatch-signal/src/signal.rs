//! Signal data model.
//!
//! A signal is a trading position proposal: an entry boundary and a
//! price band `[min_price, max_price]` whose sides play profit or loss
//! depending on the signal kind.

use bandwatch_core::{ChannelId, Price, SignalId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SignalError, SignalResult};

/// Signal kind: buy (long) or sell (short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Lifecycle status.
///
/// Legal transitions: Pending→Active→Closed, Pending→Canceled,
/// Active→Closed. Closed and Canceled are terminal; removal afterwards
/// is a soft-delete flag, never a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Pending,
    Active,
    Closed,
    Canceled,
}

impl SignalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Canceled)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Creation request for a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDraft {
    pub owner: UserId,
    pub kind: SignalKind,
    /// Boundary whose crossing activates the signal.
    pub entry_price: Price,
    /// Lower band edge (profit for Sell, loss for Buy).
    pub min_price: Price,
    /// Upper band edge (profit for Buy, loss for Sell).
    pub max_price: Price,
    /// Price at the moment of creation.
    pub created_price: Price,
    /// Whether activation should claim a publish channel slot.
    pub publishable: bool,
}

/// A trading signal owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub owner: UserId,
    pub kind: SignalKind,
    pub status: SignalStatus,
    pub entry_price: Price,
    pub min_price: Price,
    pub max_price: Price,
    pub created_price: Price,
    /// Set if and only if `status == Closed`.
    pub closed_price: Option<Price>,
    /// Break-even stop, set post-hoc by the owner.
    pub risk_free: bool,
    pub publishable: bool,
    /// Publish slot held while Active (publishable signals only).
    pub assigned_channel: Option<ChannelId>,
    /// Logical deletion flag for terminal signals.
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// Validate a draft and build a Pending signal.
    ///
    /// The band must satisfy `min_price < entry_price < max_price` with
    /// all levels positive; the strict inequalities keep the scoring
    /// denominator `|loss - entry|` non-zero for the signal's lifetime.
    pub fn from_draft(draft: SignalDraft) -> SignalResult<Self> {
        if !draft.entry_price.is_positive()
            || !draft.min_price.is_positive()
            || !draft.created_price.is_positive()
        {
            return Err(SignalError::InvalidArgument(format!(
                "prices must be positive (entry={}, min={}, created={})",
                draft.entry_price, draft.min_price, draft.created_price
            )));
        }
        if !(draft.min_price < draft.entry_price && draft.entry_price < draft.max_price) {
            return Err(SignalError::InvalidArgument(format!(
                "band must satisfy min < entry < max (min={}, entry={}, max={})",
                draft.min_price, draft.entry_price, draft.max_price
            )));
        }

        Ok(Self {
            id: SignalId::generate(),
            owner: draft.owner,
            kind: draft.kind,
            status: SignalStatus::Pending,
            entry_price: draft.entry_price,
            min_price: draft.min_price,
            max_price: draft.max_price,
            created_price: draft.created_price,
            closed_price: None,
            risk_free: false,
            publishable: draft.publishable,
            assigned_channel: None,
            deleted: false,
            created_at: Utc::now(),
            activated_at: None,
            closed_at: None,
        })
    }

    /// Band edge on the profit side.
    pub fn profit_price(&self) -> Price {
        match self.kind {
            SignalKind::Buy => self.max_price,
            SignalKind::Sell => self.min_price,
        }
    }

    /// Band edge on the loss side.
    pub fn loss_price(&self) -> Price {
        match self.kind {
            SignalKind::Buy => self.min_price,
            SignalKind::Sell => self.max_price,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `current` reached or passed the entry in the favorable
    /// direction, the risk-free break-even exit condition.
    pub fn breakeven_reached(&self, current: Price) -> bool {
        match self.kind {
            SignalKind::Buy => current >= self.entry_price,
            SignalKind::Sell => current <= self.entry_price,
        }
    }
}
