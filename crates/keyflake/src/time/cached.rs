use core::time::Duration;
use std::{
    io,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{TimeSource, TimeUnit};

/// Shared ticker thread that updates once per unit.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A wall-clock source refreshed by a background thread.
///
/// On construction the clock stores the current tick and spawns one thread
/// that rewrites it at every unit boundary (every millisecond or every
/// second). Reads are a single atomic load, so the hot path performs no
/// syscall. The trade-off is up to one unit of staleness.
///
/// The thread only holds a weak reference to the shared tick. Once the last
/// clone of the clock is dropped it exits on its next wake-up, so it never
/// outlives its owner by more than one unit.
#[derive(Clone, Debug)]
pub struct CachedClock {
    inner: Arc<SharedTickerInner>,
    unit: TimeUnit,
}

impl CachedClock {
    /// Starts a cached clock for the given unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticker thread cannot be spawned.
    pub fn start(unit: TimeUnit) -> io::Result<Self> {
        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(read_tick(unit)),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let period = unit.tick_duration().as_nanos();
        let handle = thread::Builder::new()
            .name("keyflake-clock".into())
            .spawn(move || {
                #[cfg(feature = "tracing")]
                tracing::debug!(?unit, "cached clock ticker started");

                loop {
                    {
                        let Some(inner_ref) = weak_inner.upgrade() else {
                            break;
                        };
                        inner_ref.current.store(read_tick(unit), Ordering::Relaxed);
                    }

                    // Sleep until the next unit boundary of the wall clock
                    let since_epoch = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_nanos();
                    let remaining = period - since_epoch % period;
                    thread::sleep(Duration::from_nanos(remaining as u64));
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(?unit, "cached clock ticker stopped");
            })?;

        // A fresh `OnceLock` is always empty.
        let _ = inner._handle.set(handle);

        Ok(Self { inner, unit })
    }

    pub const fn unit(&self) -> TimeUnit {
        self.unit
    }
}

impl TimeSource for CachedClock {
    fn current_tick(&self) -> u64 {
        self.inner.current.load(Ordering::Relaxed)
    }
}

fn read_tick(unit: TimeUnit) -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| unit.ticks(elapsed))
}
