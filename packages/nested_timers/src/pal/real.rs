//! Real clock implementation backed by the operating system monotonic clock.

use std::time::Instant;

use crate::pal::abstractions::Clock;

/// Resolution reported when the platform cannot be queried.
const FALLBACK_RESOLUTION_SECS: f64 = 1e-9;

/// Monotonic wall clock, counting seconds from the moment the clock was created.
///
/// # Examples
///
/// ```
/// use nested_timers::{Clock, MonotonicClock};
///
/// let clock = MonotonicClock::new();
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// assert!(clock.resolution() > 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose zero point is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn resolution(&self) -> f64 {
        platform_resolution()
    }
}

#[cfg(unix)]
#[cfg_attr(test, mutants::skip)] // Value depends on the platform, only sanity-checked.
fn platform_resolution() -> f64 {
    let mut timespec = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    // SAFETY: `timespec` is a valid, writable timespec that lives for the duration of the call.
    let result = unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &raw mut timespec) };

    if result != 0 {
        return FALLBACK_RESOLUTION_SECS;
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "clock resolutions are tiny values, far from the precision limit"
    )]
    let resolution = timespec.tv_sec as f64 + timespec.tv_nsec as f64 * 1e-9;

    if resolution > 0.0 {
        resolution
    } else {
        FALLBACK_RESOLUTION_SECS
    }
}

#[cfg(not(unix))]
fn platform_resolution() -> f64 {
    FALLBACK_RESOLUTION_SECS
}
