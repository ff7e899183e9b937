//! Publish channel pool.
//!
//! Activated publishable signals are distributed across a fixed pool of
//! output channels. Assignment picks the channel with the fewest
//! currently-active signals; ties go to the lowest slot, so equal loads
//! fill in pool order.

use bandwatch_core::ChannelId;
use tracing::warn;

/// Fixed pool of publish channel slots with per-slot load counters.
#[derive(Debug, Clone)]
pub struct ChannelPool {
    active: Vec<u32>,
}

impl ChannelPool {
    /// Create a pool with `size` slots. A zero-sized pool assigns
    /// nothing (publishing disabled).
    pub fn new(size: u32) -> Self {
        Self {
            active: vec![0; size as usize],
        }
    }

    /// Claim the least-loaded slot.
    pub fn assign(&mut self) -> Option<ChannelId> {
        let (idx, _) = self
            .active
            .iter()
            .enumerate()
            .min_by_key(|(idx, load)| (**load, *idx))?;
        self.active[idx] += 1;
        Some(ChannelId::new(idx as u32))
    }

    /// Release a slot claimed earlier.
    pub fn release(&mut self, channel: ChannelId) {
        match self.active.get_mut(channel.index() as usize) {
            Some(load) if *load > 0 => *load -= 1,
            _ => warn!(%channel, "release of unclaimed channel slot"),
        }
    }

    /// Current load on a slot.
    pub fn load(&self, channel: ChannelId) -> Option<u32> {
        self.active.get(channel.index() as usize).copied()
    }

    pub fn size(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_fill_in_pool_order() {
        let mut pool = ChannelPool::new(3);
        assert_eq!(pool.assign(), Some(ChannelId::new(0)));
        assert_eq!(pool.assign(), Some(ChannelId::new(1)));
        assert_eq!(pool.assign(), Some(ChannelId::new(2)));
        assert_eq!(pool.assign(), Some(ChannelId::new(0)));
    }

    #[test]
    fn test_release_makes_slot_least_loaded() {
        let mut pool = ChannelPool::new(2);
        pool.assign(); // 0
        pool.assign(); // 1
        pool.assign(); // 0 again
        pool.release(ChannelId::new(0));
        pool.release(ChannelId::new(0));
        assert_eq!(pool.assign(), Some(ChannelId::new(0)));
    }

    #[test]
    fn test_empty_pool_assigns_nothing() {
        let mut pool = ChannelPool::new(0);
        assert_eq!(pool.assign(), None);
    }

    #[test]
    fn test_release_of_unclaimed_slot_is_noop() {
        let mut pool = ChannelPool::new(1);
        pool.release(ChannelId::new(0));
        pool.release(ChannelId::new(5));
        assert_eq!(pool.load(ChannelId::new(0)), Some(0));
    }
}
