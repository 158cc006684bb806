use core::time::Duration;
use std::{
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH_START: Duration = Duration::from_millis(0);

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// A trait for time sources that return a wall-clock aligned timestamp.
///
/// This abstraction allows you to plug in the system clock, a monotonic timer
/// anchored to wall time, or a mocked time source in tests.
///
/// The unit is **nanoseconds since the UNIX epoch**. Generators derive their
/// coarse ticks from it, and use its low-order bits to compute how long to
/// back off until the next tick boundary.
///
/// # Example
///
/// ```
/// use spindle::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn now_nanos(&self) -> i64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.now_nanos(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in nanoseconds since the UNIX epoch.
    fn now_nanos(&self) -> i64;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now_nanos(&self) -> i64 {
        (**self).now_nanos()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_nanos(&self) -> i64 {
        (**self).now_nanos()
    }
}

/// Reads [`SystemTime::now`] on every call.
///
/// The wall clock may be adjusted externally (NTP, manual changes) and can
/// therefore move backwards. Prefer [`MonotonicClock`] unless timestamps must
/// follow such adjustments.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_nanos(&self) -> i64 {
        // A clock set before 1970 reads as the epoch itself.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, saturating_nanos)
    }
}

/// A time source that never goes backwards.
///
/// The wall-clock time is sampled once at construction; every later reading
/// adds the [`Instant`] elapsed since then. Timestamps stay aligned to wall
/// time while being immune to wall-clock adjustments made after startup.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    anchor_nanos: i64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Anchors a new clock to the current wall-clock time.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            anchor_nanos: SystemClock.now_nanos(),
        }
    }
}

impl TimeSource for MonotonicClock {
    fn now_nanos(&self) -> i64 {
        self.anchor_nanos
            .saturating_add(saturating_nanos(self.start.elapsed()))
    }
}

pub(crate) fn saturating_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}
