// ABOUTME: Shared pool of consumable units with a single atomic take operation.
// ABOUTME: The only state in the simulation that more than one agent mutates.

use std::sync::atomic::{AtomicU64, Ordering};

/// A finite supply of units that agents deplete one at a time.
///
/// `remaining` never goes below zero and never increases. The only way to
/// decrement it is [`ResourcePool::take_one`], a compare-and-swap loop on a
/// single atomic, so two agents racing for the last unit cannot both win.
#[derive(Debug)]
pub struct ResourcePool {
    remaining: AtomicU64,
    capacity: u64,
}

impl ResourcePool {
    /// Create a pool holding `capacity` units.
    pub fn new(capacity: u64) -> Self {
        Self {
            remaining: AtomicU64::new(capacity),
            capacity,
        }
    }

    /// Whether every unit has been claimed.
    ///
    /// This is a snapshot: another agent may claim the last unit right after
    /// it returns `false`.
    pub fn is_empty(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    /// Claim one unit if any are left.
    ///
    /// Returns 1 when a unit was claimed and 0 when the pool was already
    /// empty.
    pub fn take_one(&self) -> u64 {
        let claimed = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        u64::from(claimed)
    }

    /// Units not yet claimed.
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Units the pool started with.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Units claimed so far.
    pub fn consumed(&self) -> u64 {
        self.capacity - self.remaining()
    }
}
