use core::{fmt, time::Duration};

use crate::{Error, Result, TWITTER_EPOCH, TimeUnit};

/// Number of usable bits; the most significant bit of an ID is the reserved
/// sign bit and is always zero.
pub const USABLE_BITS: u32 = 63;

/// The bit partition of a 64-bit Snowflake ID.
///
/// Fields are packed from the most significant bit down:
///
/// ```text
///  +----------+-----------+---------------+-------------+-------------+
///  | sign (1) | timestamp | datacenter id |  worker id  |  sequence   |
///  +----------+-----------+---------------+-------------+-------------+
///  |<-- MSB --------------------- 64 bits ----------------- LSB ----->|
/// ```
///
/// Each field's shift is the sum of the widths to its right. The timestamp
/// field stores ticks since [`epoch`](Self::epoch), in [`unit`](Self::unit).
///
/// A layout is validated once and is immutable afterwards; it is `Copy` and
/// can be shared freely between threads.
///
/// # Example
///
/// ```
/// use keyflake::{BitLayout, TimeUnit};
///
/// let layout = BitLayout::new(41, 5, 5, 12, 0, TimeUnit::Millis).unwrap();
/// let id = layout.encode(1_000, 2, 3, 7);
/// let parts = layout.decode(id);
/// assert_eq!((parts.tick_delta, parts.data_center_id, parts.worker_id, parts.sequence), (1_000, 2, 3, 7));
///
/// assert!(BitLayout::new(42, 10, 10, 12, 0, TimeUnit::Millis).is_err());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BitLayout {
    timestamp_bits: u8,
    data_center_id_bits: u8,
    worker_id_bits: u8,
    sequence_bits: u8,
    epoch: u64,
    unit: TimeUnit,
}

/// The fields of an ID, as recovered by [`BitLayout::decode`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Components {
    /// Ticks since the layout epoch.
    pub tick_delta: u64,
    pub data_center_id: u64,
    pub worker_id: u64,
    pub sequence: u64,
}

impl BitLayout {
    /// Validates and builds a layout. `epoch` is expressed in ticks of `unit`
    /// since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the widths add up to more than 63
    /// bits.
    pub fn new(
        timestamp_bits: u8,
        data_center_id_bits: u8,
        worker_id_bits: u8,
        sequence_bits: u8,
        epoch: u64,
        unit: TimeUnit,
    ) -> Result<Self> {
        let total = u32::from(timestamp_bits)
            + u32::from(data_center_id_bits)
            + u32::from(worker_id_bits)
            + u32::from(sequence_bits);
        if total > USABLE_BITS {
            return Err(Error::configuration(format!(
                "bit layout uses {total} bits ({timestamp_bits} timestamp + {data_center_id_bits} datacenter + {worker_id_bits} worker + {sequence_bits} sequence), at most {USABLE_BITS} are available"
            )));
        }
        Ok(Self {
            timestamp_bits,
            data_center_id_bits,
            worker_id_bits,
            sequence_bits,
            epoch,
            unit,
        })
    }

    /// The classic millisecond layout: 41 timestamp, 5 datacenter, 5 worker and
    /// 12 sequence bits, counted from [`TWITTER_EPOCH`].
    pub fn millis() -> Self {
        Self {
            timestamp_bits: 41,
            data_center_id_bits: 5,
            worker_id_bits: 5,
            sequence_bits: 12,
            epoch: TimeUnit::Millis.ticks(TWITTER_EPOCH),
            unit: TimeUnit::Millis,
        }
    }

    /// A second-granularity layout: 31 timestamp, 5 datacenter, 5 worker and 22
    /// sequence bits, counted from [`TWITTER_EPOCH`].
    pub fn seconds() -> Self {
        Self {
            timestamp_bits: 31,
            data_center_id_bits: 5,
            worker_id_bits: 5,
            sequence_bits: 22,
            epoch: TimeUnit::Seconds.ticks(TWITTER_EPOCH),
            unit: TimeUnit::Seconds,
        }
    }

    /// Returns a copy of this layout anchored at `epoch`, a wall-clock instant
    /// given as the duration since 1970-01-01 UTC.
    #[must_use]
    pub const fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = self.unit.ticks(epoch);
        self
    }

    pub const fn timestamp_bits(&self) -> u8 {
        self.timestamp_bits
    }

    pub const fn data_center_id_bits(&self) -> u8 {
        self.data_center_id_bits
    }

    pub const fn worker_id_bits(&self) -> u8 {
        self.worker_id_bits
    }

    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    /// The epoch in ticks since the Unix epoch.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub const fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub const fn max_timestamp(&self) -> u64 {
        mask(self.timestamp_bits)
    }

    pub const fn max_data_center_id(&self) -> u64 {
        mask(self.data_center_id_bits)
    }

    pub const fn max_worker_id(&self) -> u64 {
        mask(self.worker_id_bits)
    }

    pub const fn max_sequence(&self) -> u64 {
        mask(self.sequence_bits)
    }

    pub const fn worker_id_shift(&self) -> u8 {
        self.sequence_bits
    }

    pub const fn data_center_id_shift(&self) -> u8 {
        self.sequence_bits + self.worker_id_bits
    }

    pub const fn timestamp_shift(&self) -> u8 {
        self.sequence_bits + self.worker_id_bits + self.data_center_id_bits
    }

    /// Packs the components into an ID. Each component is masked to its
    /// field width; callers validate ranges beforehand.
    pub const fn encode(
        &self,
        tick_delta: u64,
        data_center_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> i64 {
        let raw = ((tick_delta & self.max_timestamp()) << self.timestamp_shift())
            | ((data_center_id & self.max_data_center_id()) << self.data_center_id_shift())
            | ((worker_id & self.max_worker_id()) << self.worker_id_shift())
            | (sequence & self.max_sequence());
        // The sign bit is never set, see `USABLE_BITS`.
        raw as i64
    }

    /// Unpacks an ID. Never fails: any `i64` is split by the masks of this
    /// layout, whether or not this layout produced it.
    pub const fn decode(&self, id: i64) -> Components {
        let raw = id as u64;
        Components {
            tick_delta: (raw >> self.timestamp_shift()) & self.max_timestamp(),
            data_center_id: (raw >> self.data_center_id_shift()) & self.max_data_center_id(),
            worker_id: (raw >> self.worker_id_shift()) & self.max_worker_id(),
            sequence: raw & self.max_sequence(),
        }
    }

    /// Converts an absolute tick into the value stored in the timestamp field.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockBeforeEpoch`] if `tick` precedes the epoch
    /// - [`Error::TimestampOverflow`] if the delta no longer fits the field
    pub fn tick_delta(&self, tick: u64) -> Result<u64> {
        let delta = tick.checked_sub(self.epoch).ok_or(Error::ClockBeforeEpoch {
            tick,
            epoch: self.epoch,
        })?;
        if !within_range(delta, self.max_timestamp()) {
            return Err(Error::TimestampOverflow {
                tick_delta: delta,
                max: self.max_timestamp(),
            });
        }
        Ok(delta)
    }
}

impl Default for BitLayout {
    fn default() -> Self {
        Self::millis()
    }
}

impl fmt::Debug for BitLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitLayout ({:?}, epoch {}) {{", self.unit, self.epoch)?;
        let fields = [
            ("timestamp", self.timestamp_bits, self.timestamp_shift()),
            ("data_center_id", self.data_center_id_bits, self.data_center_id_shift()),
            ("worker_id", self.worker_id_bits, self.worker_id_shift()),
            ("sequence", self.sequence_bits, 0),
        ];
        for (name, bits, shift) in fields {
            if bits == 0 {
                writeln!(f, "    {name:<15} (0 bits)")?;
            } else {
                let hi = shift + bits - 1;
                writeln!(f, "    {name:<15} ({bits:>2} bits, {hi:>2}..={shift:<2})")?;
            }
        }
        write!(f, "}}")
    }
}

/// Returns `true` if `value` fits below or at `max`.
pub const fn within_range(value: u64, max: u64) -> bool {
    value <= max
}

/// Validates a named component against its maximum.
///
/// # Errors
///
/// Returns [`Error::Configuration`] naming the field if `value > max`.
pub fn check_range(field: &str, value: u64, max: u64) -> Result<u64> {
    if within_range(value, max) {
        Ok(value)
    } else {
        Err(Error::configuration(format!(
            "{field} {value} is out of range (max {max})"
        )))
    }
}

const fn mask(bits: u8) -> u64 {
    // bits <= 63, guaranteed by validation
    (1u64 << bits) - 1
}
