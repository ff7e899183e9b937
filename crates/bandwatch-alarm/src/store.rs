//! Armed alarm storage keyed by target price.
//!
//! The backing structure is a `BTreeMap<Price, BTreeSet<UserId>>` so that
//! consumption of a tick is an O(log n + k) range scan over the movement
//! interval, where k is the number of fired alarms. One mutex guards the
//! whole map: a scan and its removals happen under a single lock
//! acquisition, so a registration racing a tick is either fully visible
//! to that tick or deferred entirely to the next one.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use tracing::debug;

use bandwatch_core::{Price, PriceObservation, UserId};

use crate::error::{AlarmError, AlarmResult};

/// An alarm consumed by a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmFired {
    /// Owner of the alarm.
    pub user_id: UserId,
    /// Target price that was crossed.
    pub target_price: Price,
}

/// Price-ordered store of armed alarms.
///
/// An alarm has no status: existence means armed, absence means consumed
/// or canceled. Firing removes the entry atomically, so a second
/// consumption of the same movement returns nothing.
#[derive(Debug, Default)]
pub struct AlarmStore {
    armed: Mutex<BTreeMap<Price, BTreeSet<UserId>>>,
}

impl AlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm an alarm for `user` at `target`.
    ///
    /// Rejects non-positive targets. Re-registering an identical
    /// `(user, target)` pair is idempotent: the post-state is the same
    /// as after a single registration.
    pub fn register(&self, user: UserId, target: Price) -> AlarmResult<()> {
        if !target.is_positive() {
            return Err(AlarmError::InvalidTarget(target));
        }

        let mut armed = self.armed.lock();
        let inserted = armed.entry(target).or_default().insert(user);
        if inserted {
            debug!(%user, %target, "alarm armed");
        }
        Ok(())
    }

    /// Disarm the matching alarm.
    ///
    /// Returns whether an entry existed. Absence (already consumed or
    /// never registered) is expected traffic, not an error.
    pub fn cancel(&self, user: UserId, target: Price) -> bool {
        let mut armed = self.armed.lock();
        let existed = match armed.get_mut(&target) {
            Some(users) => users.remove(&user),
            None => false,
        };
        if existed {
            if armed.get(&target).is_some_and(|u| u.is_empty()) {
                armed.remove(&target);
            }
            debug!(%user, %target, "alarm canceled");
        }
        existed
    }

    /// Consume every armed alarm whose target lies inside the movement
    /// interval of `observation`.
    ///
    /// Scan and removal happen under one lock acquisition, so each alarm
    /// fires at most once no matter how registrations and ticks
    /// interleave. A flat observation consumes nothing.
    pub fn consume_crossed(&self, observation: &PriceObservation) -> Vec<AlarmFired> {
        if !observation.is_movement() {
            return Vec::new();
        }

        let lo = observation.low();
        let hi = observation.high();

        let mut armed = self.armed.lock();
        let hit_prices: Vec<Price> = armed.range(lo..=hi).map(|(price, _)| *price).collect();

        let mut fired = Vec::new();
        for price in hit_prices {
            if let Some(users) = armed.remove(&price) {
                for user_id in users {
                    fired.push(AlarmFired {
                        user_id,
                        target_price: price,
                    });
                }
            }
        }

        if !fired.is_empty() {
            debug!(count = fired.len(), %lo, %hi, "alarms fired");
        }
        fired
    }

    /// Whether `(user, target)` is currently armed.
    pub fn is_armed(&self, user: UserId, target: Price) -> bool {
        self.armed
            .lock()
            .get(&target)
            .is_some_and(|users| users.contains(&user))
    }

    /// Number of armed alarms across all users.
    pub fn armed_count(&self) -> usize {
        self.armed.lock().values().map(BTreeSet::len).sum()
    }

    /// Number of armed alarms held by `user`.
    ///
    /// The per-user cap is a caller concern; this is the count the
    /// caller enforces it against.
    pub fn armed_for(&self, user: UserId) -> usize {
        self.armed
            .lock()
            .values()
            .filter(|users| users.contains(&user))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandwatch_core::Price;
    use rust_decimal_macros::dec;

    fn px(v: rust_decimal::Decimal) -> Price {
        Price::new(v)
    }

    fn obs(previous: rust_decimal::Decimal, current: rust_decimal::Decimal) -> PriceObservation {
        PriceObservation::new(px(previous), px(current))
    }

    #[test]
    fn test_register_rejects_non_positive_target() {
        let store = AlarmStore::new();
        assert!(store.register(UserId::new(1), px(dec!(0))).is_err());
        assert!(store.register(UserId::new(1), px(dec!(-2450))).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_is_idempotent() {
        let store = AlarmStore::new();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();
        assert_eq!(store.armed_count(), 1);

        let fired = store.consume_crossed(&obs(dec!(2440), dec!(2455)));
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_cancel_reports_existence() {
        let store = AlarmStore::new();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();

        assert!(store.cancel(UserId::new(1), px(dec!(2450))));
        // Second cancel is a benign no-op.
        assert!(!store.cancel(UserId::new(1), px(dec!(2450))));
        assert!(!store.cancel(UserId::new(2), px(dec!(2450))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_consume_fires_exactly_once() {
        let store = AlarmStore::new();
        store.register(UserId::new(7), px(dec!(2450))).unwrap();

        let fired = store.consume_crossed(&obs(dec!(2440), dec!(2455)));
        assert_eq!(
            fired,
            vec![AlarmFired {
                user_id: UserId::new(7),
                target_price: px(dec!(2450)),
            }]
        );

        // A later movement elsewhere returns empty.
        let fired = store.consume_crossed(&obs(dec!(2460), dec!(2470)));
        assert!(fired.is_empty());
    }

    #[test]
    fn test_consume_twice_without_rearm_is_empty() {
        let store = AlarmStore::new();
        store.register(UserId::new(7), px(dec!(2450))).unwrap();

        let movement = obs(dec!(2440), dec!(2455));
        assert_eq!(store.consume_crossed(&movement).len(), 1);
        assert!(store.consume_crossed(&movement).is_empty());
    }

    #[test]
    fn test_one_gap_fires_multiple_users() {
        let store = AlarmStore::new();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();
        store.register(UserId::new(2), px(dec!(2451))).unwrap();

        let mut fired = store.consume_crossed(&obs(dec!(2449), dec!(2452)));
        fired.sort_by_key(|f| f.user_id);
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].user_id, UserId::new(1));
        assert_eq!(fired[0].target_price, px(dec!(2450)));
        assert_eq!(fired[1].user_id, UserId::new(2));
        assert_eq!(fired[1].target_price, px(dec!(2451)));
    }

    #[test]
    fn test_same_target_two_users_fire_together() {
        let store = AlarmStore::new();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();
        store.register(UserId::new(2), px(dec!(2450))).unwrap();

        let fired = store.consume_crossed(&obs(dec!(2449), dec!(2452)));
        assert_eq!(fired.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_flat_observation_consumes_nothing() {
        let store = AlarmStore::new();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();

        assert!(store.consume_crossed(&obs(dec!(2450), dec!(2450))).is_empty());
        assert_eq!(store.armed_count(), 1);
    }

    #[test]
    fn test_downward_movement_fires() {
        let store = AlarmStore::new();
        store.register(UserId::new(3), px(dec!(2450))).unwrap();

        let fired = store.consume_crossed(&obs(dec!(2455), dec!(2440)));
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_armed_for_counts_only_that_user() {
        let store = AlarmStore::new();
        store.register(UserId::new(1), px(dec!(2450))).unwrap();
        store.register(UserId::new(1), px(dec!(2500))).unwrap();
        store.register(UserId::new(2), px(dec!(2450))).unwrap();

        assert_eq!(store.armed_for(UserId::new(1)), 2);
        assert_eq!(store.armed_for(UserId::new(2)), 1);
        assert_eq!(store.armed_for(UserId::new(3)), 0);
        assert_eq!(store.armed_count(), 3);
    }

    #[test]
    fn test_registration_between_ticks_fires_on_next_tick() {
        let store = AlarmStore::new();

        assert!(store.consume_crossed(&obs(dec!(2440), dec!(2445))).is_empty());
        store.register(UserId::new(9), px(dec!(2448))).unwrap();
        let fired = store.consume_crossed(&obs(dec!(2445), dec!(2455)));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].user_id, UserId::new(9));
    }
}
