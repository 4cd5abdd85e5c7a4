//! Emission quota shared by every classification

use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of alerts allowed over the quota's lifetime
pub const DEFAULT_QUOTA_CAPACITY: u64 = 5;

/// Bounded budget of alerts
///
/// Share it by reference (or `Arc`) between all classifiers that should draw
/// from the same budget. Consumption only goes back down through `reset`.
#[derive(Debug)]
pub struct Quota {
    capacity: u64,
    consumed: AtomicU64,
}

impl Quota {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            consumed: AtomicU64::new(0),
        }
    }

    /// Take one unit of budget if any is left
    ///
    /// The check and the increment are a single atomic step, so concurrent
    /// callers can never push consumption past capacity.
    pub fn try_acquire(&self) -> bool {
        self.consumed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |consumed| {
                (consumed < self.capacity).then_some(consumed + 1)
            })
            .is_ok()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.consumed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.consumed() >= self.capacity
    }

    /// Restore the full budget
    pub fn reset(&self) {
        self.consumed.store(0, Ordering::Release);
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_exhausted() {
        let quota = Quota::new(3);
        assert!(quota.try_acquire());
        assert!(quota.try_acquire());
        assert_eq!(quota.remaining(), 1);
        assert!(quota.try_acquire());

        assert!(quota.is_exhausted());
        assert!(!quota.try_acquire());
        assert_eq!(quota.consumed(), 3);
    }

    #[test]
    fn test_zero_capacity_never_grants() {
        let quota = Quota::new(0);
        assert!(quota.is_exhausted());
        assert!(!quota.try_acquire());
    }

    #[test]
    fn test_reset_restores_budget() {
        let quota = Quota::default();
        while quota.try_acquire() {}
        assert_eq!(quota.consumed(), DEFAULT_QUOTA_CAPACITY);

        quota.reset();
        assert_eq!(quota.remaining(), DEFAULT_QUOTA_CAPACITY);
        assert!(quota.try_acquire());
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_capacity() {
        let quota = Quota::new(50);
        let granted = AtomicU64::new(0);

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        if quota.try_acquire() {
                            granted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(granted.load(Ordering::Relaxed), 50);
        assert_eq!(quota.consumed(), 50);
    }
}
