//! Fake clock implementation for testing.

use std::sync::{Arc, Mutex};

use crate::pal::abstractions::Clock;

#[derive(Debug)]
struct FakeClockState {
    now: f64,
    resolution: f64,
}

/// Fake clock whose time only changes when a test says so.
///
/// Clones share the same underlying state, so a test can keep one clone and move
/// time forward while the profiler holds another.
#[derive(Clone, Debug)]
pub(crate) struct FakeClock {
    state: Arc<Mutex<FakeClockState>>,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeClockState {
                now: 0.0,
                resolution: 1e-9,
            })),
        }
    }

    pub(crate) fn set(&self, now: f64) {
        self.state
            .lock()
            .expect("FakeClock state lock should not be poisoned")
            .now = now;
    }

    pub(crate) fn advance(&self, seconds: f64) {
        self.state
            .lock()
            .expect("FakeClock state lock should not be poisoned")
            .now += seconds;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> f64 {
        self.state
            .lock()
            .expect("FakeClock state lock should not be poisoned")
            .now
    }

    fn resolution(&self) -> f64 {
        self.state
            .lock()
            .expect("FakeClock state lock should not be poisoned")
            .resolution
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values are set by the test")]

    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = FakeClock::new();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn clones_share_time() {
        let clock1 = FakeClock::new();
        let clock2 = clock1.clone();

        clock1.set(10.0);
        clock2.advance(2.5);

        assert_eq!(clock1.now(), 12.5);
        assert_eq!(clock2.now(), 12.5);
    }
}
