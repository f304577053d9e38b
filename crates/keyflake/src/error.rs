use core::time::Duration;

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `keyflake` can produce.
///
/// Configuration errors are raised while building a layout, identity or
/// generator and mean the generator is unusable. Everything else is raised by
/// a single [`next_id`] call and leaves the generator intact, so the caller
/// can back off and retry.
///
/// Sequence exhaustion is not an error: generators absorb it by waiting for
/// the next tick.
///
/// [`next_id`]: crate::SnowflakeGenerator::next_id
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The bit layout, the worker identity or a generator option is invalid.
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    /// The clock reported a tick earlier than the last tick handed out, by more
    /// than the configured tolerance.
    #[error("clock moved backwards by {behind} ticks (last: {last_tick}, now: {current_tick})")]
    ClockRollback {
        /// Last tick (relative to the epoch) that produced an ID.
        last_tick: u64,
        /// Tick (relative to the epoch) observed by the failing call.
        current_tick: u64,
        /// Magnitude of the rollback, in ticks.
        behind: u64,
    },

    /// The clock reads earlier than the layout's epoch.
    #[error("clock tick {tick} is before the layout epoch {epoch}")]
    ClockBeforeEpoch { tick: u64, epoch: u64 },

    /// The timestamp no longer fits the layout's timestamp field.
    #[error("timestamp {tick_delta} exceeds the layout maximum {max}")]
    TimestampOverflow { tick_delta: u64, max: u64 },

    /// Waiting for the clock to advance took longer than the stall timeout.
    #[error("clock did not advance within {waited:?}")]
    ClockStalled { waited: Duration },

    /// The buffered producer did not deliver an ID in time.
    #[error("no buffered id available within {waited:?}")]
    BufferTimeout { waited: Duration },

    /// The buffered producer thread is no longer running.
    #[error("buffered id producer stopped")]
    ProducerStopped,

    /// The allocator lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant only exists
    /// without the `parking-lot` feature.
    #[cfg(not(feature = "parking-lot"))]
    #[error("allocator lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised at construction time.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` if the clock moved backwards past the tolerance.
    pub const fn is_clock_rollback(&self) -> bool {
        matches!(self, Self::ClockRollback { .. })
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::allocator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
