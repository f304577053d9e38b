use crate::{AllocStatus, Result, SequencePolicy};

/// A minimal interface over the sequence state machine.
///
/// Implementations differ only in how they guard their [`ClockState`]; all of
/// them run [`ClockState::advance`] and therefore hand out the same pairs for
/// the same ticks.
///
/// [`ClockState`]: crate::ClockState
/// [`ClockState::advance`]: crate::ClockState::advance
pub trait SequenceAllocator {
    /// Creates an allocator with an empty state.
    fn new(policy: SequencePolicy) -> Self;

    /// Attempts to allocate a pair. `now` reads the current tick relative to
    /// the layout epoch; it is called once, after the allocator has observed
    /// its state, so that a tick committed by another thread is never newer
    /// than the tick this call reads.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRollback`] if the clock went backwards past the
    ///   tolerance
    /// - [`Error::LockPoisoned`] for a poisoned lock-based allocator
    /// - any error returned by `now`
    ///
    /// [`Error::ClockRollback`]: crate::Error::ClockRollback
    /// [`Error::LockPoisoned`]: crate::Error
    fn try_allocate(&self, now: impl FnOnce() -> Result<u64>) -> Result<AllocStatus>;
}
