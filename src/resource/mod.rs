// ABOUTME: Resource module - the exclusive resources around the ring and the shared pool.
// ABOUTME: Contains the bounded-wait lock and the atomically depleted counter.

mod exclusive;
mod pool;

pub use exclusive::{Acquire, ExclusiveResource, ResourceGuard};
pub use pool::ResourcePool;

#[cfg(test)]
mod exclusive_test;
