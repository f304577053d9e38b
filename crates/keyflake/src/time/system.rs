use std::time::{SystemTime, UNIX_EPOCH};

use crate::{TimeSource, TimeUnit};

/// A direct wall-clock source: every read is a fresh `SystemTime` call.
///
/// Always accurate, at the cost of one clock syscall per allocation. A system
/// clock set before 1970 reads as tick `0`, which the generator then rejects
/// as being before the layout epoch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SystemClock {
    unit: TimeUnit,
}

impl SystemClock {
    pub const fn new(unit: TimeUnit) -> Self {
        Self { unit }
    }

    pub const fn unit(&self) -> TimeUnit {
        self.unit
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(TimeUnit::Millis)
    }
}

impl TimeSource for SystemClock {
    fn current_tick(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| self.unit.ticks(elapsed))
    }
}
