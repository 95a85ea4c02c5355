//! Platform abstraction layer for the wall-clock time source.
//!
//! This module allows switching between the real monotonic clock, a caller-supplied clock
//! and (in tests) a fake clock whose time is set explicitly.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub use abstractions::Clock;
pub(crate) use facade::ClockFacade;
#[cfg(test)]
pub(crate) use fake::FakeClock;
pub use real::MonotonicClock;
