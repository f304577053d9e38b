use core::time::Duration;
use std::sync::Arc;

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH_ORIGIN: Duration = Duration::from_millis(0);

/// A source of the current tick.
///
/// A tick is the wall-clock time since 1970-01-01 UTC, truncated to the unit
/// the source was configured with (see [`TimeUnit`]). Generators subtract the
/// layout epoch themselves, so implementations never need to know it.
///
/// This abstraction allows you to plug in the system clock, the cached
/// background clock, or a mocked time source in tests.
///
/// # Example
///
/// ```
/// use keyflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_tick(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_tick(), 1234);
/// ```
///
/// [`TimeUnit`]: crate::TimeUnit
pub trait TimeSource {
    /// Returns the current tick since the Unix epoch.
    fn current_tick(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_tick(&self) -> u64 {
        (**self).current_tick()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_tick(&self) -> u64 {
        (**self).current_tick()
    }
}
