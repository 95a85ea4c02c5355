//! Clock facade for switching between real, caller-supplied and fake implementations.

use std::sync::Arc;

use crate::pal::abstractions::Clock;
#[cfg(test)]
use crate::pal::fake::FakeClock;
use crate::pal::real::MonotonicClock;

#[derive(Clone, Debug)]
pub(crate) enum ClockFacade {
    Real(MonotonicClock),

    /// A clock supplied by the caller through the profiler builder.
    Custom(Arc<dyn Clock>),

    #[cfg(test)]
    Fake(FakeClock),
}

impl ClockFacade {
    pub(crate) fn real() -> Self {
        Self::Real(MonotonicClock::new())
    }

    pub(crate) fn custom(clock: impl Clock) -> Self {
        Self::Custom(Arc::new(clock))
    }

    #[cfg(test)]
    pub(crate) fn fake(clock: FakeClock) -> Self {
        Self::Fake(clock)
    }
}

impl Clock for ClockFacade {
    fn now(&self) -> f64 {
        match self {
            Self::Real(clock) => clock.now(),
            Self::Custom(clock) => clock.now(),
            #[cfg(test)]
            Self::Fake(clock) => clock.now(),
        }
    }

    fn resolution(&self) -> f64 {
        match self {
            Self::Real(clock) => clock.resolution(),
            Self::Custom(clock) => clock.resolution(),
            #[cfg(test)]
            Self::Fake(clock) => clock.resolution(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values are set by the test")]

    use super::*;

    #[test]
    fn fake_facade_forwards_time() {
        let clock = FakeClock::new();
        let facade = ClockFacade::fake(clock.clone());

        clock.set(42.0);
        assert_eq!(facade.now(), 42.0);
    }

    #[test]
    fn custom_facade_forwards_time() {
        let clock = FakeClock::new();
        clock.set(7.0);
        let facade = ClockFacade::custom(clock);

        assert_eq!(facade.now(), 7.0);
        assert!(facade.resolution() > 0.0);
    }

    #[test]
    fn real_facade_is_monotonic() {
        let facade = ClockFacade::real();
        let first = facade.now();
        assert!(facade.now() >= first);
    }
}
