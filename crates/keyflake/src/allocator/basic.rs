use core::cell::Cell;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{AllocStatus, ClockState, Result, SequenceAllocator, SequencePolicy, Transition};

/// A non-concurrent allocator for a single owner.
///
/// The state lives in a [`Cell`], so this allocator is `Send` but not `Sync`.
/// The buffered strategy's producer thread owns one.
///
/// ## See Also
/// - [`LockAllocator`]
/// - [`AtomicAllocator`]
///
/// [`LockAllocator`]: crate::LockAllocator
/// [`AtomicAllocator`]: crate::AtomicAllocator
#[derive(Debug)]
pub struct BasicAllocator {
    state: Cell<ClockState>,
    policy: SequencePolicy,
}

impl BasicAllocator {
    pub const fn new(policy: SequencePolicy) -> Self {
        Self {
            state: Cell::new(ClockState::EMPTY),
            policy,
        }
    }

    /// Allocates the next pair, reading the tick with `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRollback`] if the clock went backwards past the
    /// tolerance, or the error returned by `now`.
    ///
    /// [`Error::ClockRollback`]: crate::Error::ClockRollback
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus> {
        let transition = self.state.get().advance(now()?, &self.policy)?;
        if let Transition::Advance(next) = transition {
            self.state.set(next);
        }
        Ok(transition.status(&self.policy))
    }
}

impl SequenceAllocator for BasicAllocator {
    fn new(policy: SequencePolicy) -> Self {
        Self::new(policy)
    }

    fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus> {
        self.try_allocate(now)
    }
}
