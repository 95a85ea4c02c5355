//! Clock abstraction trait definitions.

use std::fmt::Debug;

/// Provides monotonic wall-clock time to the profiler.
///
/// Both methods may be called concurrently from any number of threads without any
/// mutual exclusion on the caller side.
pub trait Clock: Debug + Send + Sync + 'static {
    /// Returns the elapsed time in seconds since an arbitrary fixed point.
    ///
    /// Successive calls never return a smaller value.
    fn now(&self) -> f64;

    /// Returns the smallest time increment in seconds that the clock can represent.
    fn resolution(&self) -> f64;
}
