use std::marker::PhantomData;

use crate::{Profiler, Result, TimerId};

/// An open timer that is stopped when dropped.
///
/// Created by [`Profiler::timer()`] and [`Profiler::timer_id()`]. The guard must be dropped on
/// the thread that created it, as every thread has its own position in the timer tree.
///
/// Errors from stopping on drop are logged. Use [`stop()`][Self::stop] to observe them.
///
/// # Examples
///
/// ```
/// use nested_timers::Profiler;
///
/// let profiler = Profiler::new();
///
/// let timer = profiler.timer("solve").unwrap();
/// // Timed work.
/// timer.stop_with_units(128.0, "iterations").unwrap();
/// ```
#[derive(Debug)]
#[must_use = "The timer is stopped when the guard is dropped"]
pub struct Timer<'a> {
    profiler: &'a Profiler,
    id: TimerId,
    stopped: bool,

    _single_threaded: PhantomData<*const ()>,
}

impl<'a> Timer<'a> {
    pub(crate) fn new(profiler: &'a Profiler, id: TimerId) -> Self {
        Self {
            profiler,
            id,
            stopped: false,
            _single_threaded: PhantomData,
        }
    }

    /// The id of the open timer.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Stops the timer.
    ///
    /// # Errors
    ///
    /// Returns an error if, with validation enabled, the timer is no longer the current timer.
    pub fn stop(mut self) -> Result<()> {
        self.stopped = true;
        self.profiler.stop_id(self.id)
    }

    /// Stops the timer and records the amount of work done while it was open.
    ///
    /// # Errors
    ///
    /// Returns an error if, with validation enabled, the timer is no longer the current timer.
    pub fn stop_with_units(mut self, work_units: f64, work_unit_label: &str) -> Result<()> {
        self.stopped = true;
        self.profiler
            .stop_id_with_units_label(self.id, work_units, work_unit_label)
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            // The error has already been logged by the profiler.
            _ = self.profiler.stop_id(self.id);
        }
    }
}
