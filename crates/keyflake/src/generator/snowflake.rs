use core::time::Duration;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AllocStatus, AllocationStrategy, AtomicAllocator, BitLayout, BufferedAllocator, ClockSource,
    Error, GeneratorConfig, LockAllocator, Result, SequenceAllocator, SequencePolicy,
    TimeSource, Unique, WorkerIdentity, pause,
};

#[derive(Debug)]
enum Allocation {
    Synchronized(LockAllocator),
    LockFree(AtomicAllocator),
    Buffered(BufferedAllocator),
}

/// A thread-safe Snowflake ID generator.
///
/// Each ID packs, from the most significant bit down: a zero sign bit, the
/// tick since the layout epoch, the datacenter id, the worker id and a
/// per-tick sequence. IDs from one generator are unique and strictly
/// increasing in allocation order; IDs from generators with distinct
/// identities never collide.
///
/// The generator is `Send + Sync` and is meant to be shared (for example in an
/// [`Arc`]) across threads. How those threads are serialized depends on the
/// configured [`AllocationStrategy`].
///
/// `T` is the clock. [`SnowflakeGenerator::new`] uses a [`ClockSource`],
/// which can be switched between direct and cached reads at runtime;
/// [`SnowflakeGenerator::with_clock`] accepts any [`TimeSource`].
///
/// # Example
///
/// ```
/// use keyflake::{GeneratorConfig, SnowflakeGenerator};
///
/// let config = GeneratorConfig::default().with_explicit_identity(3, 2);
/// let generator = SnowflakeGenerator::new(&config).unwrap();
///
/// let a = generator.next_id().unwrap();
/// let b = generator.next_id().unwrap();
/// assert!(a < b);
///
/// let unique = generator.parse(b);
/// assert_eq!(unique.worker_id(), 3);
/// assert_eq!(unique.data_center_id(), 2);
/// ```
///
/// [`Arc`]: std::sync::Arc
#[derive(Debug)]
pub struct SnowflakeGenerator<T = ClockSource> {
    layout: BitLayout,
    identity: WorkerIdentity,
    clock: T,
    allocation: Allocation,
    strategy: AllocationStrategy,
    stall_timeout: Option<Duration>,
}

impl SnowflakeGenerator<ClockSource> {
    /// Builds a generator reading the system clock, directly or through the
    /// cached ticker depending on `config.use_clock`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the layout or the identity is
    /// invalid, or if a buffered strategy has a capacity of zero.
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        Self::with_clock(config, ClockSource::new(config.unit, config.use_clock))
    }

    /// Switches between cached (`true`) and direct (`false`) clock reads. Takes
    /// effect on the next allocation and is safe to call concurrently with
    /// [`next_id`](Self::next_id).
    ///
    /// With a buffered strategy the switch also applies to the producer
    /// thread, which shares this clock.
    pub fn set_use_clock(&self, use_clock: bool) {
        self.clock.set_use_clock(use_clock);
    }

    pub fn use_clock(&self) -> bool {
        self.clock.use_clock()
    }
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource + Clone + Send + 'static,
{
    /// Builds a generator reading ticks from `clock`.
    ///
    /// The clock must count ticks since 1970-01-01 UTC in the configured
    /// unit. A buffered strategy hands a clone of it to the producer thread.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::new`].
    pub fn with_clock(config: &GeneratorConfig, clock: T) -> Result<Self> {
        let layout = config.bit_layout()?;
        let identity = WorkerIdentity::resolve(&layout, config.identity)?;
        let policy = SequencePolicy::new(&layout, config.max_rollback);

        let allocation = match config.strategy {
            AllocationStrategy::Synchronized => {
                Allocation::Synchronized(LockAllocator::new(policy))
            }
            AllocationStrategy::LockFree => Allocation::LockFree(AtomicAllocator::new(policy)),
            AllocationStrategy::Buffered { capacity } => {
                Allocation::Buffered(BufferedAllocator::spawn(
                    layout,
                    identity,
                    policy,
                    clock.clone(),
                    capacity,
                    config.buffer_timeout,
                )?)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            ?layout,
            worker_id = identity.worker_id(),
            data_center_id = identity.data_center_id(),
            strategy = ?config.strategy,
            "snowflake generator ready"
        );

        Ok(Self {
            layout,
            identity,
            clock,
            allocation,
            strategy: config.strategy,
            stall_timeout: config.stall_timeout,
        })
    }
}

impl<T: TimeSource> SnowflakeGenerator<T> {
    /// Returns the next ID.
    ///
    /// Waits for the clock to advance when the current tick's sequence is
    /// exhausted (or, with a rollback tolerance, when the clock stepped back
    /// by a tolerated amount).
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRollback`] if the clock moved backwards past the
    ///   tolerance
    /// - [`Error::ClockBeforeEpoch`] or [`Error::TimestampOverflow`] if the
    ///   current time does not fit the layout
    /// - [`Error::ClockStalled`] if waiting exceeded the stall timeout
    /// - [`Error::BufferTimeout`] or [`Error::ProducerStopped`] with a
    ///   buffered strategy
    ///
    /// The generator stays usable after any of these.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<i64> {
        match &self.allocation {
            Allocation::Synchronized(allocator) => self.allocate_with(allocator),
            Allocation::LockFree(allocator) => self.allocate_with(allocator),
            Allocation::Buffered(buffer) => buffer.next_id(),
        }
    }

    /// Returns `count` consecutive IDs, stopping at the first error.
    ///
    /// # Errors
    ///
    /// See [`next_id`](Self::next_id).
    pub fn next_ids(&self, count: usize) -> Result<Vec<i64>> {
        (0..count).map(|_| self.next_id()).collect()
    }

    /// Decodes `id` with this generator's layout. Any `i64` is accepted; the
    /// result is only meaningful for IDs produced with the same layout.
    pub fn parse(&self, id: i64) -> Unique {
        Unique::decode(&self.layout, id)
    }

    pub const fn layout(&self) -> &BitLayout {
        &self.layout
    }

    pub const fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub const fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    pub const fn clock(&self) -> &T {
        &self.clock
    }

    fn allocate_with<A: SequenceAllocator>(&self, allocator: &A) -> Result<i64> {
        let mut waiting_since: Option<Instant> = None;
        loop {
            let status =
                allocator.try_allocate(|| self.layout.tick_delta(self.clock.current_tick()))?;
            match status {
                AllocStatus::Ready { tick, sequence } => {
                    return Ok(self.layout.encode(
                        tick,
                        self.identity.data_center_id(),
                        self.identity.worker_id(),
                        sequence,
                    ));
                }
                AllocStatus::Pending { yield_for } => {
                    if let Some(limit) = self.stall_timeout {
                        let waited = waiting_since.get_or_insert_with(Instant::now).elapsed();
                        if waited > limit {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(?waited, "clock stalled");
                            return Err(Error::ClockStalled { waited });
                        }
                    }
                    pause(yield_for, self.layout.unit());
                }
            }
        }
    }
}
