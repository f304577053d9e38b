use crate::TimeUnit;

/// Outcome of a single allocation attempt.
///
/// - [`AllocStatus::Ready`] carries the `(tick, sequence)` pair to encode.
/// - [`AllocStatus::Pending`] means no pair can be handed out until the clock
///   advances; the caller should wait roughly `yield_for` ticks and retry. A
///   `yield_for` of zero means a lost race that can be retried immediately.
///
/// Generators loop on `Pending` internally, so only code driving an allocator
/// by hand sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocStatus {
    /// A fresh `(tick, sequence)` pair.
    Ready {
        /// Ticks since the layout epoch.
        tick: u64,
        sequence: u64,
    },
    /// Try again after the clock moves forward.
    Pending {
        /// Ticks to wait before retrying.
        yield_for: u64,
    },
}

/// Waits before retrying a [`AllocStatus::Pending`] allocation.
///
/// A lost race (`0`) only spins, an exhausted sequence (`1`) yields the
/// thread, and anything longer (a tolerated rollback) sleeps until roughly one
/// tick before the target.
pub fn pause(yield_for: u64, unit: TimeUnit) {
    match yield_for {
        0 => core::hint::spin_loop(),
        1 => std::thread::yield_now(),
        n => {
            let ticks = u32::try_from(n - 1).unwrap_or(u32::MAX);
            std::thread::sleep(unit.tick_duration().saturating_mul(ticks));
        }
    }
}
