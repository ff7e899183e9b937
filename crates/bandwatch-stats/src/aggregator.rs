//! Aggregate statistics recomputed on every signal closure.
//!
//! Aggregation is a full recomputation over the owner's closed set, not
//! an incremental accumulation: a duplicated or replayed closure event
//! converges to the same numbers instead of double-counting. Results
//! live in a `DashMap` so readers (leaderboards, profile views) never
//! contend with the tick path.

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bandwatch_core::UserId;
use bandwatch_signal::SignalOutcome;

/// Derived statistics for one user.
///
/// Never independently authored: every field is a function of the
/// user's closed signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserStats {
    /// Number of closed signals.
    pub total_signals: u64,
    /// Percentage of closed signals with a positive pip.
    pub win_rate: Decimal,
    /// Mean realized risk/reward across closed signals.
    pub avg_risk_reward: Decimal,
    /// Sum of score contributions.
    pub total_score: Decimal,
}

impl UserStats {
    /// Compute stats from scratch over a closed-signal outcome set.
    pub fn compute(outcomes: &[SignalOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self::default();
        }

        let total = Decimal::from(outcomes.len());
        let wins = outcomes.iter().filter(|o| o.pip > Decimal::ZERO).count();
        let win_rate = Decimal::from(100) * Decimal::from(wins) / total;
        let avg_risk_reward =
            outcomes.iter().map(|o| o.risk_reward).sum::<Decimal>() / total;
        let total_score = outcomes.iter().map(|o| o.score).sum();

        Self {
            total_signals: outcomes.len() as u64,
            win_rate,
            avg_risk_reward,
            total_score,
        }
    }
}

/// Owner of derived per-user statistics.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    stats: DashMap<UserId, UserStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute and store `user`'s stats from their full closed set.
    pub fn recompute(&self, user: UserId, outcomes: &[SignalOutcome]) -> UserStats {
        let stats = UserStats::compute(outcomes);
        debug!(
            %user,
            total = stats.total_signals,
            win_rate = %stats.win_rate,
            total_score = %stats.total_score,
            "stats recomputed"
        );
        self.stats.insert(user, stats);
        stats
    }

    /// Latest computed stats for `user`, if any closure was seen.
    pub fn get(&self, user: UserId) -> Option<UserStats> {
        self.stats.get(&user).map(|entry| *entry.value())
    }
}
