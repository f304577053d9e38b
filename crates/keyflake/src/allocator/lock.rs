#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AllocStatus, ClockState, Mutex, Result, SequenceAllocator, SequencePolicy, Transition,
};

/// A lock-based allocator: the whole state-machine step runs under one mutex.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
///
/// ## Recommended When
/// - You want the simplest correct strategy
/// - Contention is moderate
///
/// With the `parking-lot` feature the mutex is a `parking_lot::Mutex`, which
/// does not poison; otherwise a poisoned lock surfaces as
/// `Error::LockPoisoned`.
///
/// ## See Also
/// - [`AtomicAllocator`]
/// - [`BufferedAllocator`]
///
/// [`AtomicAllocator`]: crate::AtomicAllocator
/// [`BufferedAllocator`]: crate::BufferedAllocator
#[derive(Debug)]
pub struct LockAllocator {
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<ClockState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<ClockState>,
    policy: SequencePolicy,
}

impl LockAllocator {
    pub fn new(policy: SequencePolicy) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(ClockState::EMPTY)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(ClockState::EMPTY),
            policy,
        }
    }

    /// Allocates the next pair, reading the tick with `now`.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRollback`] if the clock went backwards past the
    ///   tolerance
    /// - `Error::LockPoisoned` if another thread panicked while holding the
    ///   lock (std mutex only)
    /// - any error returned by `now`
    ///
    /// [`Error::ClockRollback`]: crate::Error::ClockRollback
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus> {
        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        // Read the clock under the lock so ticks are observed in commit order
        let transition = state.advance(now()?, &self.policy)?;
        if let Transition::Advance(next) = transition {
            *state = next;
        }
        Ok(transition.status(&self.policy))
    }
}

impl SequenceAllocator for LockAllocator {
    fn new(policy: SequencePolicy) -> Self {
        Self::new(policy)
    }

    fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus> {
        self.try_allocate(now)
    }
}
