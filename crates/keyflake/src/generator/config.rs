use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    BitLayout, DEFAULT_BUFFER_CAPACITY, DEFAULT_BUFFER_TIMEOUT, IdentityMode, Result,
    TWITTER_EPOCH, TimeUnit,
};

/// How a generator serializes access to its sequence state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// One mutex around the state machine. See [`LockAllocator`].
    ///
    /// [`LockAllocator`]: crate::LockAllocator
    #[default]
    Synchronized,
    /// Compare-and-swap on a packed atomic state. See [`AtomicAllocator`].
    ///
    /// [`AtomicAllocator`]: crate::AtomicAllocator
    LockFree,
    /// A producer thread keeps up to `capacity` IDs queued. See
    /// [`BufferedAllocator`].
    ///
    /// [`BufferedAllocator`]: crate::BufferedAllocator
    Buffered { capacity: usize },
}

impl AllocationStrategy {
    /// A buffered strategy with [`DEFAULT_BUFFER_CAPACITY`].
    pub const fn buffered() -> Self {
        Self::Buffered {
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Everything needed to build a [`SnowflakeGenerator`].
///
/// The defaults describe the classic layout (41 timestamp, 5 datacenter, 5
/// worker, 12 sequence bits, milliseconds since [`TWITTER_EPOCH`]) with a
/// host-derived identity, direct clock reads and the synchronized strategy.
///
/// All fields are public and `serde`-deserializable; missing fields take
/// their defaults. Durations are written as milliseconds.
///
/// # Example
///
/// ```
/// use keyflake::{AllocationStrategy, GeneratorConfig, SnowflakeGenerator};
///
/// let config = GeneratorConfig::default()
///     .with_explicit_identity(3, 2)
///     .with_strategy(AllocationStrategy::LockFree);
/// let generator = SnowflakeGenerator::new(&config).unwrap();
///
/// let id = generator.next_id().unwrap();
/// let unique = generator.parse(id);
/// assert_eq!((unique.worker_id(), unique.data_center_id()), (3, 2));
/// ```
///
/// [`SnowflakeGenerator`]: crate::SnowflakeGenerator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub timestamp_bits: u8,
    pub data_center_id_bits: u8,
    pub worker_id_bits: u8,
    pub sequence_bits: u8,
    /// Reference instant, as the duration since 1970-01-01 UTC.
    #[serde(with = "millis")]
    pub epoch: Duration,
    pub unit: TimeUnit,
    pub identity: IdentityMode,
    /// Read the cached background clock instead of the system clock.
    pub use_clock: bool,
    pub strategy: AllocationStrategy,
    /// Largest backward clock step, in ticks, that is waited out instead of
    /// failing with `ClockRollback`. Zero disables the tolerance.
    pub max_rollback: u64,
    /// Fail with `ClockStalled` once a single call has waited this long for
    /// the clock. `None` waits indefinitely.
    #[serde(with = "opt_millis")]
    pub stall_timeout: Option<Duration>,
    /// How long a caller waits on an empty buffer (buffered strategy only).
    #[serde(with = "millis")]
    pub buffer_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timestamp_bits: 41,
            data_center_id_bits: 5,
            worker_id_bits: 5,
            sequence_bits: 12,
            epoch: TWITTER_EPOCH,
            unit: TimeUnit::Millis,
            identity: IdentityMode::Derived,
            use_clock: false,
            strategy: AllocationStrategy::Synchronized,
            max_rollback: 0,
            stall_timeout: None,
            buffer_timeout: DEFAULT_BUFFER_TIMEOUT,
        }
    }
}

impl GeneratorConfig {
    /// Validates the bit partition and builds the layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the widths exceed 63 bits.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn bit_layout(&self) -> Result<BitLayout> {
        BitLayout::new(
            self.timestamp_bits,
            self.data_center_id_bits,
            self.worker_id_bits,
            self.sequence_bits,
            self.unit.ticks(self.epoch),
            self.unit,
        )
    }

    /// Copies widths, epoch and unit from an existing layout.
    #[must_use]
    pub fn with_layout(mut self, layout: &BitLayout) -> Self {
        self.timestamp_bits = layout.timestamp_bits();
        self.data_center_id_bits = layout.data_center_id_bits();
        self.worker_id_bits = layout.worker_id_bits();
        self.sequence_bits = layout.sequence_bits();
        self.epoch = Duration::from_millis(layout.unit().to_millis(layout.epoch()));
        self.unit = layout.unit();
        self
    }

    #[must_use]
    pub const fn with_bits(
        mut self,
        timestamp_bits: u8,
        data_center_id_bits: u8,
        worker_id_bits: u8,
        sequence_bits: u8,
    ) -> Self {
        self.timestamp_bits = timestamp_bits;
        self.data_center_id_bits = data_center_id_bits;
        self.worker_id_bits = worker_id_bits;
        self.sequence_bits = sequence_bits;
        self
    }

    #[must_use]
    pub const fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    #[must_use]
    pub const fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub const fn with_explicit_identity(mut self, worker_id: u64, data_center_id: u64) -> Self {
        self.identity = IdentityMode::Explicit {
            worker_id,
            data_center_id,
        };
        self
    }

    #[must_use]
    pub const fn with_derived_identity(mut self) -> Self {
        self.identity = IdentityMode::Derived;
        self
    }

    #[must_use]
    pub const fn with_use_clock(mut self, use_clock: bool) -> Self {
        self.use_clock = use_clock;
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_max_rollback(mut self, ticks: u64) -> Self {
        self.max_rollback = ticks;
        self
    }

    #[must_use]
    pub const fn with_stall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stall_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_buffer_timeout(mut self, timeout: Duration) -> Self {
        self.buffer_timeout = timeout;
        self
    }
}

mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_classic_layout() {
        let layout = GeneratorConfig::default().bit_layout().unwrap();
        assert_eq!(layout, BitLayout::millis());
    }

    #[test]
    fn with_layout_round_trips() {
        let config = GeneratorConfig::default().with_layout(&BitLayout::seconds());
        assert_eq!(config.bit_layout().unwrap(), BitLayout::seconds());
    }

    #[test]
    fn rejects_oversized_bits() {
        let config = GeneratorConfig::default().with_bits(50, 5, 5, 12);
        assert!(config.bit_layout().unwrap_err().is_configuration());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{
                "sequence_bits": 10,
                "unit": "ms",
                "identity": { "mode": "explicit", "worker_id": 3, "data_center_id": 2 },
                "strategy": { "buffered": { "capacity": 128 } },
                "stall_timeout": 250,
                "buffer_timeout": 1000
            }"#,
        )
        .unwrap();

        assert_eq!(config.sequence_bits, 10);
        assert_eq!(config.timestamp_bits, 41);
        assert_eq!(config.epoch, TWITTER_EPOCH);
        assert_eq!(config.identity, IdentityMode::Explicit {
            worker_id: 3,
            data_center_id: 2
        });
        assert_eq!(config.strategy, AllocationStrategy::Buffered { capacity: 128 });
        assert_eq!(config.stall_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.buffer_timeout, Duration::from_secs(1));
    }

    #[test]
    fn serializes_durations_as_millis() {
        let json = serde_json::to_value(GeneratorConfig::default()).unwrap();
        assert_eq!(json["epoch"], 1_288_834_974_657_u64);
        assert!(json["stall_timeout"].is_null());
        assert_eq!(json["strategy"], "synchronized");
    }
}
