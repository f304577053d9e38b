use core::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use keyflake::{
    AllocationStrategy, DEFAULT_BUFFER_CAPACITY, GeneratorConfig, IdentityMode, TWITTER_EPOCH,
    TimeUnit,
};

#[allow(clippy::cast_possible_truncation)]
const DEFAULT_EPOCH_MS: u64 = TWITTER_EPOCH.as_millis() as u64;

/// Top-level command line.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keyflake",
    version,
    about = "Generate and decode Snowflake-style 64-bit IDs"
)]
pub struct Cli {
    #[command(flatten)]
    pub generator: CliArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print freshly generated IDs, one per line.
    Generate {
        /// Number of IDs to print.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Decode IDs produced with the configured layout.
    Parse {
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Synchronized,
    LockFree,
    Buffered,
}

/// Generator settings, parsed from flags or `KEYFLAKE_*` environment
/// variables.
///
/// Defaults match [`GeneratorConfig::default`]: the classic 41/5/5/12 layout
/// in milliseconds since the Twitter epoch, with an identity derived from the
/// host.
#[derive(clap::Args, Debug, Clone)]
pub struct CliArgs {
    /// Width of the timestamp field.
    ///
    /// Environment variable: `KEYFLAKE_TIMESTAMP_BITS`
    #[arg(long, env = "KEYFLAKE_TIMESTAMP_BITS", default_value_t = 41)]
    pub timestamp_bits: u8,

    /// Width of the datacenter id field.
    ///
    /// Environment variable: `KEYFLAKE_DATA_CENTER_ID_BITS`
    #[arg(long, env = "KEYFLAKE_DATA_CENTER_ID_BITS", default_value_t = 5)]
    pub data_center_id_bits: u8,

    /// Width of the worker id field.
    ///
    /// Environment variable: `KEYFLAKE_WORKER_ID_BITS`
    #[arg(long, env = "KEYFLAKE_WORKER_ID_BITS", default_value_t = 5)]
    pub worker_id_bits: u8,

    /// Width of the sequence field.
    ///
    /// Environment variable: `KEYFLAKE_SEQUENCE_BITS`
    #[arg(long, env = "KEYFLAKE_SEQUENCE_BITS", default_value_t = 12)]
    pub sequence_bits: u8,

    /// Custom epoch in milliseconds since 1970-01-01 UTC.
    ///
    /// Environment variable: `KEYFLAKE_EPOCH_MS`
    #[arg(long, env = "KEYFLAKE_EPOCH_MS", default_value_t = DEFAULT_EPOCH_MS)]
    pub epoch_ms: u64,

    /// Tick granularity: `millis` or `seconds`.
    ///
    /// Environment variable: `KEYFLAKE_UNIT`
    #[arg(long, env = "KEYFLAKE_UNIT", default_value = "millis")]
    pub unit: TimeUnit,

    /// Explicit worker id. Requires `--data-center-id`; when both are absent
    /// the identity is derived from the host.
    ///
    /// Environment variable: `KEYFLAKE_WORKER_ID`
    #[arg(long, env = "KEYFLAKE_WORKER_ID")]
    pub worker_id: Option<u64>,

    /// Explicit datacenter id. Requires `--worker-id`.
    ///
    /// Environment variable: `KEYFLAKE_DATA_CENTER_ID`
    #[arg(long, env = "KEYFLAKE_DATA_CENTER_ID")]
    pub data_center_id: Option<u64>,

    /// Read time from a background ticker instead of the system clock.
    ///
    /// Environment variable: `KEYFLAKE_USE_CLOCK`
    #[arg(long, env = "KEYFLAKE_USE_CLOCK", default_value_t = false)]
    pub use_clock: bool,

    /// How concurrent callers are serialized.
    ///
    /// Environment variable: `KEYFLAKE_STRATEGY`
    #[arg(long, env = "KEYFLAKE_STRATEGY", value_enum, default_value_t = StrategyArg::Synchronized)]
    pub strategy: StrategyArg,

    /// Number of IDs the buffered strategy keeps ready.
    ///
    /// Environment variable: `KEYFLAKE_BUFFER_CAPACITY`
    #[arg(long, env = "KEYFLAKE_BUFFER_CAPACITY", default_value_t = DEFAULT_BUFFER_CAPACITY)]
    pub buffer_capacity: usize,

    /// How long to wait on an empty buffer, in milliseconds.
    ///
    /// Environment variable: `KEYFLAKE_BUFFER_TIMEOUT_MS`
    #[arg(long, env = "KEYFLAKE_BUFFER_TIMEOUT_MS", default_value_t = 5_000)]
    pub buffer_timeout_ms: u64,

    /// Backward clock steps up to this many ticks are waited out instead of
    /// failing.
    ///
    /// Environment variable: `KEYFLAKE_MAX_ROLLBACK`
    #[arg(long, env = "KEYFLAKE_MAX_ROLLBACK", default_value_t = 0)]
    pub max_rollback: u64,

    /// Give up on an ID after waiting this long for the clock, in
    /// milliseconds. Unset waits indefinitely.
    ///
    /// Environment variable: `KEYFLAKE_STALL_TIMEOUT_MS`
    #[arg(long, env = "KEYFLAKE_STALL_TIMEOUT_MS")]
    pub stall_timeout_ms: Option<u64>,
}

impl TryFrom<CliArgs> for GeneratorConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let identity = match (args.worker_id, args.data_center_id) {
            (Some(worker_id), Some(data_center_id)) => IdentityMode::Explicit {
                worker_id,
                data_center_id,
            },
            (None, None) => IdentityMode::Derived,
            (Some(_), None) => bail!("KEYFLAKE_WORKER_ID is set but KEYFLAKE_DATA_CENTER_ID is not"),
            (None, Some(_)) => bail!("KEYFLAKE_DATA_CENTER_ID is set but KEYFLAKE_WORKER_ID is not"),
        };

        let strategy = match args.strategy {
            StrategyArg::Synchronized => AllocationStrategy::Synchronized,
            StrategyArg::LockFree => AllocationStrategy::LockFree,
            StrategyArg::Buffered => {
                if args.buffer_capacity == 0 {
                    bail!("KEYFLAKE_BUFFER_CAPACITY must be greater than 0");
                }
                AllocationStrategy::Buffered {
                    capacity: args.buffer_capacity,
                }
            }
        };

        let config = Self {
            timestamp_bits: args.timestamp_bits,
            data_center_id_bits: args.data_center_id_bits,
            worker_id_bits: args.worker_id_bits,
            sequence_bits: args.sequence_bits,
            epoch: Duration::from_millis(args.epoch_ms),
            unit: args.unit,
            identity,
            use_clock: args.use_clock,
            strategy,
            max_rollback: args.max_rollback,
            stall_timeout: args.stall_timeout_ms.map(Duration::from_millis),
            buffer_timeout: Duration::from_millis(args.buffer_timeout_ms),
        };

        config.bit_layout().context("invalid bit layout")?;
        Ok(config)
    }
}
