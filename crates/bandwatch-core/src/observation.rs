//! Price observations and boundary-crossing detection.
//!
//! A `PriceObservation` is the immutable `(previous, current)` pair
//! presented exactly once per tick to the signal engine and the alarm
//! store. `crossed` is the single predicate both consult.

use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tick worth of price movement.
///
/// `previous` for tick N+1 is always exactly `current` from tick N; the
/// single-consumer tick loop upholds that ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Price at the previous tick.
    pub previous: Price,
    /// Price at this tick.
    pub current: Price,
    /// Timestamp when the current price was observed.
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(previous: Price, current: Price) -> Self {
        Self {
            previous,
            current,
            observed_at: Utc::now(),
        }
    }

    /// Lower bound of the movement interval.
    #[inline]
    pub fn low(&self) -> Price {
        self.previous.min(self.current)
    }

    /// Upper bound of the movement interval.
    #[inline]
    pub fn high(&self) -> Price {
        self.previous.max(self.current)
    }

    /// Whether the price moved at all on this tick.
    #[inline]
    pub fn is_movement(&self) -> bool {
        self.previous != self.current
    }

    /// Whether `threshold` was crossed by this observation.
    #[inline]
    pub fn crosses(&self, threshold: Price) -> bool {
        crossed(threshold, self.previous, self.current)
    }
}

/// True iff `threshold` lies within `[min(previous, current),
/// max(previous, current)]` and the price actually moved.
///
/// The movement requirement handles the boundary edge case: when
/// `previous == threshold` (price already sitting on the boundary), the
/// crossing is reported on the first subsequent movement instead of being
/// permanently treated as already consumed. A flat tick never crosses
/// anything. Detection is gap-safe: upstream feeds may coalesce updates
/// into arbitrarily large jumps and every threshold inside the jump still
/// reports a crossing.
#[inline]
pub fn crossed(threshold: Price, previous: Price, current: Price) -> bool {
    if previous == current {
        return false;
    }
    let lo = previous.min(current);
    let hi = previous.max(current);
    lo <= threshold && threshold <= hi
}
