use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::{CachedClock, SystemClock, TimeSource, TimeUnit};

#[derive(Debug)]
struct ClockSourceInner {
    direct: SystemClock,
    use_clock: AtomicBool,
    // `None` if the ticker thread could not be spawned.
    cached: OnceLock<Option<CachedClock>>,
    // Highest tick served by a direct read; cached reads never go below it.
    direct_floor: AtomicU64,
}

/// The clock used by [`SnowflakeGenerator::new`].
///
/// Reads go either straight to the system clock (direct mode) or to a shared
/// [`CachedClock`] (cached mode), switched at runtime with
/// [`set_use_clock`]. The switch takes effect on the next read.
///
/// The cached ticker is started lazily on the first cached read and at most
/// once per source; clones share it, along with the mode flag. A cached read
/// never reports a tick earlier than the last direct read, so switching from
/// direct to cached mode is never mistaken for a clock rollback.
///
/// [`SnowflakeGenerator::new`]: crate::SnowflakeGenerator::new
/// [`set_use_clock`]: ClockSource::set_use_clock
#[derive(Clone, Debug)]
pub struct ClockSource {
    inner: Arc<ClockSourceInner>,
}

impl ClockSource {
    pub fn new(unit: TimeUnit, use_clock: bool) -> Self {
        Self {
            inner: Arc::new(ClockSourceInner {
                direct: SystemClock::new(unit),
                use_clock: AtomicBool::new(use_clock),
                cached: OnceLock::new(),
                direct_floor: AtomicU64::new(0),
            }),
        }
    }

    pub fn unit(&self) -> TimeUnit {
        self.inner.direct.unit()
    }

    /// Switches between cached (`true`) and direct (`false`) reads.
    pub fn set_use_clock(&self, use_clock: bool) {
        #[cfg(feature = "tracing")]
        tracing::debug!(use_clock, "switching clock mode");
        self.inner.use_clock.store(use_clock, Ordering::Relaxed);
    }

    /// Returns `true` in cached mode.
    pub fn use_clock(&self) -> bool {
        self.inner.use_clock.load(Ordering::Relaxed)
    }

    /// Returns `true` once the background ticker has been started.
    pub fn is_ticker_started(&self) -> bool {
        matches!(self.inner.cached.get(), Some(Some(_)))
    }

    fn cached(&self) -> Option<&CachedClock> {
        self.inner
            .cached
            .get_or_init(|| match CachedClock::start(self.unit()) {
                Ok(clock) => Some(clock),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_e, "failed to start cached clock, reading the system clock directly");
                    None
                }
            })
            .as_ref()
    }

    fn read_direct(&self) -> u64 {
        let tick = self.inner.direct.current_tick();
        self.inner.direct_floor.fetch_max(tick, Ordering::Relaxed);
        tick
    }
}

impl TimeSource for ClockSource {
    fn current_tick(&self) -> u64 {
        if !self.use_clock() {
            return self.read_direct();
        }
        match self.cached() {
            Some(clock) => clock
                .current_tick()
                .max(self.inner.direct_floor.load(Ordering::Relaxed)),
            None => self.read_direct(),
        }
    }
}
