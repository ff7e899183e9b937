//! Pip, score and risk/reward formulas.
//!
//! All arithmetic is exact `Decimal`; pips are the scaled price delta
//! `Δprice × 10`, rounded half-away-from-zero at three decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

use bandwatch_core::Price;

use crate::error::{SignalError, SignalResult};
use crate::signal::{Signal, SignalKind, SignalStatus};

const PIP_SCALE: Decimal = Decimal::TEN;

/// Scored outcome of a closed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalOutcome {
    /// Realized pip, floored at zero for risk-free signals.
    pub pip: Decimal,
    /// Leaderboard score contribution.
    pub score: Decimal,
    /// Realized reward relative to the accepted risk.
    pub risk_reward: Decimal,
    /// Whether the risk-free floor absorbed a loss.
    pub floored: bool,
}

/// Score a closed signal.
///
/// Returns an invariant violation if the signal is not Closed, has no
/// closed price, or presents a degenerate band (`loss == entry`): those
/// states cannot be produced by the engine and indicate upstream
/// corruption, which must surface rather than be silently repaired.
pub fn score_closed(signal: &Signal) -> SignalResult<SignalOutcome> {
    if signal.status != SignalStatus::Closed {
        return Err(SignalError::InvariantViolation(format!(
            "scoring requested for {} signal {}",
            signal.status, signal.id
        )));
    }
    let closed = signal.closed_price.ok_or_else(|| {
        SignalError::InvariantViolation(format!("closed signal {} has no closed price", signal.id))
    })?;

    let loss_pip = signal.loss_price().distance(signal.entry_price) * PIP_SCALE;
    if loss_pip.is_zero() {
        return Err(SignalError::InvariantViolation(format!(
            "signal {} has loss side equal to entry {}",
            signal.id, signal.entry_price
        )));
    }

    let raw_pip = raw_pip(signal.kind, signal.entry_price, closed);
    let floored = signal.risk_free && raw_pip < Decimal::ZERO;
    let pip = if floored { Decimal::ZERO } else { raw_pip };

    let score = if pip.is_zero() {
        Decimal::ZERO
    } else {
        let divisor = if pip < Decimal::ZERO {
            Decimal::TEN
        } else {
            Decimal::from(50)
        };
        (pip / loss_pip) * (pip.abs() / divisor + Decimal::TEN)
    };

    let risk_reward = if floored {
        Decimal::ZERO
    } else {
        let profit_ref = if pip > Decimal::ZERO {
            closed
        } else {
            signal.profit_price()
        };
        profit_ref.distance(signal.entry_price) / signal.loss_price().distance(signal.entry_price)
    };

    Ok(SignalOutcome {
        pip,
        score,
        risk_reward,
        floored,
    })
}

/// Unfloored pip for a closed price.
fn raw_pip(kind: SignalKind, entry: Price, closed: Price) -> Decimal {
    let delta = match kind {
        SignalKind::Sell => entry.inner() - closed.inner(),
        SignalKind::Buy => closed.inner() - entry.inner(),
    };
    (delta * PIP_SCALE).round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandwatch_core::UserId;
    use rust_decimal_macros::dec;

    use crate::signal::SignalDraft;

    fn closed_signal(
        kind: SignalKind,
        entry: Decimal,
        min: Decimal,
        max: Decimal,
        closed: Decimal,
        risk_free: bool,
    ) -> Signal {
        let mut signal = Signal::from_draft(SignalDraft {
            owner: UserId::new(1),
            kind,
            entry_price: Price::new(entry),
            min_price: Price::new(min),
            max_price: Price::new(max),
            created_price: Price::new(entry),
            publishable: false,
        })
        .unwrap();
        signal.status = SignalStatus::Closed;
        signal.closed_price = Some(Price::new(closed));
        signal.risk_free = risk_free;
        signal
    }

    #[test]
    fn test_sell_loss_pip() {
        // entry 2038, stop (max) 2085, closed at 2090 after a gap.
        let signal = closed_signal(SignalKind::Sell, dec!(2038), dec!(2034), dec!(2085), dec!(2090), false);
        let outcome = score_closed(&signal).unwrap();
        assert_eq!(outcome.pip, dec!(-520));
        assert!(outcome.score < Decimal::ZERO);
        assert!(!outcome.floored);
    }

    #[test]
    fn test_buy_profit_pip() {
        let signal = closed_signal(SignalKind::Buy, dec!(2000), dec!(1990), dec!(2050), dec!(2050), false);
        let outcome = score_closed(&signal).unwrap();
        assert_eq!(outcome.pip, dec!(500));
        // loss_pip = 100; score = (500/100) * (500/50 + 10) = 5 * 20 = 100
        assert_eq!(outcome.score, dec!(100));
        // profit_ref = closed; rr = 50/10 = 5
        assert_eq!(outcome.risk_reward, dec!(5));
    }

    #[test]
    fn test_risk_free_floors_negative_pip() {
        let signal = closed_signal(SignalKind::Buy, dec!(2000), dec!(1990), dec!(2050), dec!(1990), true);
        let outcome = score_closed(&signal).unwrap();
        assert_eq!(outcome.pip, Decimal::ZERO);
        assert_eq!(outcome.score, Decimal::ZERO);
        assert_eq!(outcome.risk_reward, Decimal::ZERO);
        assert!(outcome.floored);
    }

    #[test]
    fn test_risk_free_keeps_positive_pip() {
        let signal = closed_signal(SignalKind::Buy, dec!(2000), dec!(1990), dec!(2050), dec!(2010), true);
        let outcome = score_closed(&signal).unwrap();
        assert_eq!(outcome.pip, dec!(100));
        assert!(!outcome.floored);
    }

    #[test]
    fn test_loss_without_risk_free_stays_negative() {
        let signal = closed_signal(SignalKind::Buy, dec!(2000), dec!(1990), dec!(2050), dec!(1990), false);
        let outcome = score_closed(&signal).unwrap();
        assert_eq!(outcome.pip, dec!(-100));
        // loss_pip = 100; score = (-100/100) * (100/10 + 10) = -20
        assert_eq!(outcome.score, dec!(-20));
        // profit_ref = profit bound 2050; rr = |2050-2000| / |1990-2000| = 5
        assert_eq!(outcome.risk_reward, dec!(5));
    }

    #[test]
    fn test_zero_pip_scores_zero() {
        let signal = closed_signal(SignalKind::Sell, dec!(2038), dec!(2034), dec!(2085), dec!(2038), false);
        let outcome = score_closed(&signal).unwrap();
        assert_eq!(outcome.pip, Decimal::ZERO);
        assert_eq!(outcome.score, Decimal::ZERO);
        // profit_ref = profit bound (pip not > 0): 4/47
        assert_eq!(outcome.risk_reward, dec!(4) / dec!(47));
    }

    #[test]
    fn test_pip_rounds_to_three_decimals() {
        let signal = closed_signal(
            SignalKind::Buy,
            dec!(2000),
            dec!(1990),
            dec!(2050),
            dec!(2000.00005),
            false,
        );
        let outcome = score_closed(&signal).unwrap();
        // 0.0005 pips rounds half away from zero to 0.001
        assert_eq!(outcome.pip, dec!(0.001));
    }

    #[test]
    fn test_scoring_non_closed_is_invariant_violation() {
        let mut signal = closed_signal(SignalKind::Buy, dec!(2000), dec!(1990), dec!(2050), dec!(2010), false);
        signal.status = SignalStatus::Active;
        signal.closed_price = None;
        assert!(matches!(
            score_closed(&signal),
            Err(SignalError::InvariantViolation(_))
        ));
    }
}
