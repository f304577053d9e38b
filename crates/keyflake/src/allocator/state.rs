use core::cmp::Ordering;

use crate::{AllocStatus, BitLayout, Error, Result};

/// Fixed parameters of the sequence state machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequencePolicy {
    sequence_bits: u8,
    max_sequence: u64,
    max_rollback: u64,
}

impl SequencePolicy {
    /// Takes the sequence width from `layout`. `max_rollback` is the largest
    /// backward clock step, in ticks, that is waited out instead of reported.
    pub const fn new(layout: &BitLayout, max_rollback: u64) -> Self {
        Self {
            sequence_bits: layout.sequence_bits(),
            max_sequence: layout.max_sequence(),
            max_rollback,
        }
    }

    pub const fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    pub const fn max_rollback(&self) -> u64 {
        self.max_rollback
    }
}

/// The last `(tick, sequence)` pair handed out by an allocator.
///
/// Packed into one `u64` as `tick << sequence_bits | sequence` so the mutex,
/// CAS and single-owner allocators share one representation and one
/// transition function. The tick is relative to the layout epoch and fits the
/// timestamp field, so a packed state never uses the top bit; `u64::MAX`
/// marks an allocator that has not produced anything yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClockState(u64);

/// Result of feeding a tick to [`ClockState::advance`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Commit the new state and hand out its pair.
    Advance(ClockState),
    /// Keep the current state.
    Wait { yield_for: u64 },
}

impl ClockState {
    pub const EMPTY: Self = Self(u64::MAX);

    pub const fn new(tick: u64, sequence: u64, policy: &SequencePolicy) -> Self {
        Self((tick << policy.sequence_bits) | sequence)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    pub const fn last_tick(self, policy: &SequencePolicy) -> u64 {
        self.0 >> policy.sequence_bits
    }

    pub const fn sequence(self, policy: &SequencePolicy) -> u64 {
        self.0 & policy.max_sequence
    }

    /// Runs one step of the sequence state machine for the tick `now`.
    ///
    /// - first use: `(now, 0)`
    /// - same tick: sequence + 1, or wait one tick when the sequence is full
    /// - newer tick: `(now, 0)`
    /// - older tick: wait out the difference if it is within the policy's
    ///   rollback tolerance, otherwise fail
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRollback`] if `now` is behind the last tick by
    /// more than the tolerance. The state is left untouched.
    pub fn advance(self, now: u64, policy: &SequencePolicy) -> Result<Transition> {
        if self.is_empty() {
            return Ok(Transition::Advance(Self::new(now, 0, policy)));
        }

        let last_tick = self.last_tick(policy);
        match now.cmp(&last_tick) {
            Ordering::Equal => {
                let sequence = self.sequence(policy);
                if sequence < policy.max_sequence {
                    Ok(Transition::Advance(Self(self.0 + 1)))
                } else {
                    Ok(Transition::Wait { yield_for: 1 })
                }
            }
            Ordering::Greater => Ok(Transition::Advance(Self::new(now, 0, policy))),
            Ordering::Less => Self::cold_clock_behind(now, last_tick, policy),
        }
    }

    /// The pair this state hands out.
    pub const fn status(self, policy: &SequencePolicy) -> AllocStatus {
        AllocStatus::Ready {
            tick: self.last_tick(policy),
            sequence: self.sequence(policy),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_tick: u64, policy: &SequencePolicy) -> Result<Transition> {
        let behind = last_tick - now;
        if behind <= policy.max_rollback {
            #[cfg(feature = "tracing")]
            tracing::debug!(behind, last_tick, now, "waiting out tolerated clock rollback");
            return Ok(Transition::Wait { yield_for: behind });
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(behind, last_tick, now, "clock moved backwards");
        Err(Error::ClockRollback {
            last_tick,
            current_tick: now,
            behind,
        })
    }
}

impl Transition {
    /// Maps the transition to what the caller sees.
    pub const fn status(self, policy: &SequencePolicy) -> AllocStatus {
        match self {
            Self::Advance(state) => state.status(policy),
            Self::Wait { yield_for } => AllocStatus::Pending { yield_for },
        }
    }
}
