use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AllocStatus, ClockState, Result, SequenceAllocator, SequencePolicy, Transition,
};

/// A lock-free allocator: the packed [`ClockState`] lives in an
/// [`AtomicU64`] and every step is committed with a compare-and-swap.
///
/// ## Features
/// - ✅ Thread-safe
/// - ❌ Fair access across threads
///
/// ## Recommended When
/// - Many threads allocate concurrently
/// - Throughput matters more than fairness
///
/// A lost race is reported as `Pending { yield_for: 0 }`; the generator retries
/// immediately with a fresh tick.
///
/// ## See Also
/// - [`LockAllocator`]
/// - [`BufferedAllocator`]
///
/// [`LockAllocator`]: crate::LockAllocator
/// [`BufferedAllocator`]: crate::BufferedAllocator
#[derive(Debug)]
pub struct AtomicAllocator {
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    policy: SequencePolicy,
}

impl AtomicAllocator {
    pub fn new(policy: SequencePolicy) -> Self {
        let initial = ClockState::EMPTY.to_raw();
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(initial)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(initial),
            policy,
        }
    }

    /// Attempts to allocate the next pair, reading the tick with `now` after
    /// the state has been loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRollback`] if the clock went backwards past the
    /// tolerance, or the error returned by `now`.
    ///
    /// [`Error::ClockRollback`]: crate::Error::ClockRollback
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus> {
        let current_raw = self.state.load(Ordering::Acquire);
        let current = ClockState::from_raw(current_raw);

        // Read the clock only after loading the state: any tick committed
        // before the load was read before this one.
        let next = match current.advance(now()?, &self.policy)? {
            Transition::Advance(next) => next,
            wait @ Transition::Wait { .. } => return Ok(wait.status(&self.policy)),
        };

        if self
            .state
            .compare_exchange(
                current_raw,
                next.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            Ok(next.status(&self.policy))
        } else {
            // CAS failed - another thread won the race. Yield 0 to retry
            // immediately.
            Ok(AllocStatus::Pending { yield_for: 0 })
        }
    }
}

impl SequenceAllocator for AtomicAllocator {
    fn new(policy: SequencePolicy) -> Self {
        Self::new(policy)
    }

    fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus> {
        self.try_allocate(now)
    }
}
