// ABOUTME: Exclusive resource for ring seating - one holder at a time, bounded waits.
// ABOUTME: Ownership is a scoped guard; dropping it puts the resource back down.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::agent::Shutdown;

const FREE: usize = usize::MAX;

/// Result of a bounded pick-up attempt.
#[must_use = "dropping an acquired guard releases the resource immediately"]
pub enum Acquire<'a> {
    /// The caller now holds the resource until the guard is released.
    Acquired(ResourceGuard<'a>),
    /// The timeout elapsed while another agent held the resource.
    TimedOut,
    /// Shutdown was requested while waiting.
    Cancelled,
}

impl fmt::Debug for Acquire<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acquire::Acquired(guard) => f.debug_tuple("Acquired").field(guard).finish(),
            Acquire::TimedOut => write!(f, "TimedOut"),
            Acquire::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One non-shareable object in the ring, such as a single fork.
///
/// A resource is either free or held by exactly one agent. Holding is
/// represented by a [`ResourceGuard`]: acquiring returns one, and releasing
/// consumes it, so only the holder can put the resource back down.
///
/// Besides the lock itself, the resource keeps a holder marker that can be
/// read at any time for instrumentation. It is set right after the lock is
/// taken and cleared right before the lock is released.
pub struct ExclusiveResource {
    id: String,
    index: usize,
    lock: Mutex<()>,
    pub(super) holder: AtomicUsize,
}

impl ExclusiveResource {
    /// Create a free resource at ring position `index`.
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            index,
            lock: Mutex::new(()),
            holder: AtomicUsize::new(FREE),
        }
    }

    /// Stable label of this resource.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of this resource in the ring.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the agent currently holding this resource, if any.
    pub fn holder(&self) -> Option<usize> {
        match self.holder.load(Ordering::Acquire) {
            FREE => None,
            agent => Some(agent),
        }
    }

    /// Whether some agent holds this resource right now.
    pub fn is_held(&self) -> bool {
        self.holder().is_some()
    }

    /// Try to pick up this resource for agent `holder`, waiting at most
    /// `timeout`.
    ///
    /// The wait is the deadlock-avoidance mechanism: an agent that cannot get
    /// its second resource in time gives up, puts the first one down, and
    /// tries again later instead of waiting forever in a cycle.
    ///
    /// Returns [`Acquire::Cancelled`] as soon as `shutdown` is triggered,
    /// even if the timeout has not elapsed yet.
    pub async fn try_acquire(
        &self,
        holder: usize,
        timeout: Duration,
        shutdown: &Shutdown,
    ) -> Acquire<'_> {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => Acquire::Cancelled,
            result = tokio::time::timeout(timeout, self.lock.lock()) => match result {
                Ok(guard) => Acquire::Acquired(self.mark_held(holder, guard)),
                Err(_) => Acquire::TimedOut,
            },
        }
    }

    /// Pick up this resource immediately if it is free.
    pub fn try_acquire_now(&self, holder: usize) -> Option<ResourceGuard<'_>> {
        self.lock
            .try_lock()
            .ok()
            .map(|guard| self.mark_held(holder, guard))
    }

    fn mark_held<'a>(&'a self, holder: usize, guard: MutexGuard<'a, ()>) -> ResourceGuard<'a> {
        assert_ne!(holder, FREE, "agent index {holder} is reserved");
        if let Err(current) =
            self.holder
                .compare_exchange(FREE, holder, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!(
                "resource '{}' locked by agent {} while still marked as held by agent {}",
                self.id, holder, current
            );
        }

        ResourceGuard {
            resource: self,
            holder,
            _guard: guard,
        }
    }
}

impl fmt::Debug for ExclusiveResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveResource")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("holder", &self.holder())
            .finish()
    }
}

impl fmt::Display for ExclusiveResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Proof that an agent holds an [`ExclusiveResource`].
///
/// Releasing happens exactly once, either through [`ResourceGuard::release`]
/// or when the guard is dropped on any other exit path, including
/// cancellation and unwinding.
pub struct ResourceGuard<'a> {
    resource: &'a ExclusiveResource,
    holder: usize,
    // Dropped after `Drop::drop` has cleared the holder marker.
    _guard: MutexGuard<'a, ()>,
}

impl ResourceGuard<'_> {
    /// The resource this guard holds.
    pub fn resource(&self) -> &ExclusiveResource {
        self.resource
    }

    /// Index of the agent holding the resource.
    pub fn holder(&self) -> usize {
        self.holder
    }

    /// Put the resource back down.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        let cleared = self.resource.holder.compare_exchange(
            self.holder,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        // Panicking again while unwinding would abort the process.
        if let Err(current) = cleared {
            if !std::thread::panicking() {
                panic!(
                    "agent {} released resource '{}' marked as held by {:?}",
                    self.holder,
                    self.resource.id,
                    (current != FREE).then_some(current)
                );
            }
        }
    }
}

impl fmt::Debug for ResourceGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("resource", &self.resource.id)
            .field("holder", &self.holder)
            .finish()
    }
}
