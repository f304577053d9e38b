use core::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Granularity of the timestamp field.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// One tick per millisecond.
    #[default]
    #[serde(alias = "ms", alias = "milliseconds")]
    Millis,
    /// One tick per second.
    #[serde(alias = "s", alias = "secs")]
    Seconds,
}

impl TimeUnit {
    /// Length of one tick.
    pub const fn tick_duration(self) -> Duration {
        match self {
            Self::Millis => Duration::from_millis(1),
            Self::Seconds => Duration::from_secs(1),
        }
    }

    /// Truncates a duration to whole ticks.
    pub const fn ticks(self, elapsed: Duration) -> u64 {
        match self {
            Self::Millis => elapsed.as_millis() as u64,
            Self::Seconds => elapsed.as_secs(),
        }
    }

    /// Converts a tick count back to milliseconds, saturating on overflow.
    pub const fn to_millis(self, ticks: u64) -> u64 {
        match self {
            Self::Millis => ticks,
            Self::Seconds => ticks.saturating_mul(1_000),
        }
    }

    /// Name used in the canonical rendering of a decoded ID.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Millis => "MILLISECONDS",
            Self::Seconds => "SECONDS",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ms" | "millis" | "milliseconds" => Ok(Self::Millis),
            "s" | "secs" | "seconds" => Ok(Self::Seconds),
            other => Err(Error::configuration(format!(
                "unknown time unit `{other}` (expected `millis` or `seconds`)"
            ))),
        }
    }
}
