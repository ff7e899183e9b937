//! Signal lifecycle state machine.
//!
//! The engine owns every signal and is the only writer of their status.
//! Per tick, each non-terminal signal is evaluated exactly once against
//! the status it had when the tick arrived; a transition caused by a
//! tick never cascades into a second transition on that same tick.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, error, info};

use bandwatch_core::{EngineEvent, PriceObservation, SignalId, UserId};

use crate::channels::ChannelPool;
use crate::error::{SignalError, SignalResult};
use crate::scoring::{score_closed, SignalOutcome};
use crate::signal::{Signal, SignalDraft, SignalStatus};

/// Owner of signal lifecycle state.
///
/// Not internally synchronized: the caller serializes ticks and
/// commands (single-writer), which is what makes the previous/current
/// threading of observations sound.
pub struct SignalEngine {
    signals: HashMap<SignalId, Signal>,
    pool: ChannelPool,
}

impl SignalEngine {
    /// Create an engine distributing publishable signals over
    /// `channel_count` publish slots.
    pub fn new(channel_count: u32) -> Self {
        Self {
            signals: HashMap::new(),
            pool: ChannelPool::new(channel_count),
        }
    }

    /// Register a new Pending signal.
    pub fn create(&mut self, draft: SignalDraft) -> SignalResult<SignalId> {
        let signal = Signal::from_draft(draft)?;
        let id = signal.id;
        info!(
            signal = %id,
            owner = %signal.owner,
            kind = %signal.kind,
            entry = %signal.entry_price,
            min = %signal.min_price,
            max = %signal.max_price,
            "signal created"
        );
        self.signals.insert(id, signal);
        Ok(id)
    }

    /// Cancel a Pending signal.
    ///
    /// Returns the cancellation event, or `None` when the request is a
    /// benign no-op: unknown id, or a signal that already left Pending.
    /// Duplicate and late cancel requests are expected traffic.
    pub fn cancel(&mut self, id: SignalId) -> Option<EngineEvent> {
        let signal = self.signals.get_mut(&id)?;
        if signal.status != SignalStatus::Pending {
            debug!(signal = %id, status = %signal.status, "cancel ignored");
            return None;
        }
        signal.status = SignalStatus::Canceled;
        info!(signal = %id, "signal canceled");
        Some(EngineEvent::SignalCanceled { signal_id: id })
    }

    /// Mark a signal risk-free.
    ///
    /// Returns whether the flag was applied; terminal and unknown
    /// signals are a no-op.
    pub fn set_risk_free(&mut self, id: SignalId) -> bool {
        match self.signals.get_mut(&id) {
            Some(signal) if !signal.is_terminal() => {
                signal.risk_free = true;
                info!(signal = %id, "signal marked risk-free");
                true
            }
            _ => false,
        }
    }

    /// Soft-delete a terminal signal.
    ///
    /// Archived signals stay in place for audit but drop out of stats
    /// recomputation. Non-terminal signals cannot be archived.
    pub fn archive(&mut self, id: SignalId) -> bool {
        match self.signals.get_mut(&id) {
            Some(signal) if signal.is_terminal() && !signal.deleted => {
                signal.deleted = true;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: SignalId) -> Option<&Signal> {
        self.signals.get(&id)
    }

    /// Evaluate one tick against every live signal.
    ///
    /// Each signal is inspected once, against its pre-tick status:
    /// Pending signals may activate, Active signals may close, and a
    /// signal that just activated is not close-checked until the next
    /// tick. Evaluation order across signals carries no meaning.
    ///
    /// Transitions are appended to `events`. An invariant violation on
    /// one signal never suppresses the transitions of the others: the
    /// offending signal is skipped, the remaining signals are still
    /// evaluated, their events are still recorded, and the first
    /// violation is returned afterwards.
    pub fn on_tick(
        &mut self,
        observation: &PriceObservation,
        events: &mut Vec<EngineEvent>,
    ) -> SignalResult<()> {
        let mut violation: Option<SignalError> = None;
        let ids: Vec<SignalId> = self.signals.keys().copied().collect();

        for id in ids {
            let signal = match self.signals.get_mut(&id) {
                Some(s) if !s.deleted => s,
                _ => continue,
            };

            match signal.status {
                SignalStatus::Pending => {
                    if observation.crosses(signal.entry_price) {
                        if !(signal.min_price < signal.entry_price
                            && signal.entry_price < signal.max_price)
                        {
                            error!(
                                signal = %id,
                                min = %signal.min_price,
                                entry = %signal.entry_price,
                                max = %signal.max_price,
                                "refusing to activate signal with corrupt band"
                            );
                            violation.get_or_insert(SignalError::InvariantViolation(format!(
                                "signal {id} band does not straddle entry"
                            )));
                            continue;
                        }

                        signal.status = SignalStatus::Active;
                        signal.activated_at = Some(Utc::now());
                        let assigned = if signal.publishable {
                            self.pool.assign()
                        } else {
                            None
                        };
                        signal.assigned_channel = assigned;

                        info!(
                            signal = %id,
                            entry = %signal.entry_price,
                            channel = ?assigned,
                            "signal activated"
                        );
                        events.push(EngineEvent::SignalActivated {
                            signal_id: id,
                            assigned_channel: assigned,
                        });
                    }
                }
                SignalStatus::Active => {
                    let band_hit = observation.crosses(signal.max_price)
                        || observation.crosses(signal.min_price);
                    let breakeven_hit =
                        signal.risk_free && signal.breakeven_reached(observation.current);

                    if band_hit || breakeven_hit {
                        signal.status = SignalStatus::Closed;
                        signal.closed_price = Some(observation.current);
                        signal.closed_at = Some(observation.observed_at);
                        if let Some(channel) = signal.assigned_channel.take() {
                            self.pool.release(channel);
                        }

                        match score_closed(signal) {
                            Ok(outcome) => {
                                info!(
                                    signal = %id,
                                    closed = %observation.current,
                                    pip = %outcome.pip,
                                    score = %outcome.score,
                                    "signal closed"
                                );
                                events.push(EngineEvent::SignalClosed {
                                    signal_id: id,
                                    closed_price: observation.current,
                                    pip: outcome.pip,
                                    score: outcome.score,
                                });
                            }
                            Err(e) => {
                                error!(signal = %id, error = %e, "closed signal unscorable");
                                violation.get_or_insert(e);
                            }
                        }
                    }
                }
                SignalStatus::Closed | SignalStatus::Canceled => {}
            }
        }

        match violation {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Scored outcomes of every Closed, non-archived signal of `owner`.
    ///
    /// This is the authoritative input for stats recomputation; reading
    /// it twice without an intervening closure yields identical data.
    pub fn closed_outcomes_for(&self, owner: UserId) -> SignalResult<Vec<SignalOutcome>> {
        self.signals
            .values()
            .filter(|s| s.owner == owner && s.status == SignalStatus::Closed && !s.deleted)
            .map(score_closed)
            .collect()
    }

    /// Number of signals still Pending or Active.
    pub fn live_count(&self) -> usize {
        self.signals
            .values()
            .filter(|s| !s.is_terminal() && !s.deleted)
            .count()
    }
}
