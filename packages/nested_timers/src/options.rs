/// Properties of a timer that are fixed when the timer is created.
///
/// Only the first call that creates a timer at a given position applies its options; later
/// calls for the same position return the existing timer unchanged.
///
/// # Examples
///
/// ```
/// use nested_timers::{Profiler, TimerOptions};
///
/// let profiler = Profiler::new();
///
/// let id = profiler
///     .initialize_timer(
///         "write_checkpoint",
///         &TimerOptions::new().group("IO").work_unit_label("bytes"),
///     )
///     .unwrap();
///
/// profiler.start_id(id).unwrap();
/// profiler.stop_id_with_units(id, 4096.0).unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct TimerOptions {
    groups: Vec<String>,
    work_unit_label: String,
}

impl TimerOptions {
    /// Creates options for a timer without groups and without a work unit label.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the timer to a user-defined group, e.g. `"IO"` or `"MPI"`.
    ///
    /// Groups slice the timer hierarchy orthogonally: the report lists the time of every group
    /// next to the tree.
    #[must_use]
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.groups.push(name.into());
        self
    }

    /// Sets the unit of the work reported when stopping the timer, e.g. `"cells"`.
    #[must_use]
    pub fn work_unit_label(self, label: impl Into<String>) -> Self {
        Self {
            work_unit_label: label.into(),
            ..self
        }
    }

    pub(crate) fn groups(&self) -> &[String] {
        &self.groups
    }

    pub(crate) fn work_unit_label_str(&self) -> &str {
        &self.work_unit_label
    }
}

/// Options of [`Profiler::print()`][crate::Profiler::print].
#[derive(Clone, Debug)]
pub struct PrintOptions {
    file_prefix: String,
    min_fraction: f64,
}

impl PrintOptions {
    /// Creates options that write `profile_<index>.txt` files listing every timer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file_prefix: "profile".to_string(),
            min_fraction: 0.0,
        }
    }

    /// Sets the prefix of the report files. The file of subgroup `i` is `<prefix>_<i>.txt`.
    ///
    /// The prefix may contain a directory path.
    #[must_use]
    pub fn file_prefix(self, prefix: impl Into<String>) -> Self {
        Self {
            file_prefix: prefix.into(),
            ..self
        }
    }

    /// Omits timers and groups that take less than this fraction of the total time.
    #[must_use]
    pub fn min_fraction(self, min_fraction: f64) -> Self {
        Self {
            min_fraction,
            ..self
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.file_prefix
    }

    pub(crate) fn fraction(&self) -> f64 {
        self.min_fraction
    }
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options of [`Profiler::print_log()`][crate::Profiler::print_log].
#[derive(Clone, Debug)]
pub struct LogOptions {
    file_prefix: String,
    separator: String,
    max_level: usize,
    simulation_time: f64,
}

impl LogOptions {
    /// Creates options that append to `profile_log_<fingerprint>.txt`, listing timers at every
    /// level with columns separated by a space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file_prefix: "profile_log".to_string(),
            separator: " ".to_string(),
            max_level: 0,
            simulation_time: 0.0,
        }
    }

    /// Sets the prefix of the log files. The file is `<prefix>_<fingerprint>.txt`.
    #[must_use]
    pub fn file_prefix(self, prefix: impl Into<String>) -> Self {
        Self {
            file_prefix: prefix.into(),
            ..self
        }
    }

    /// Sets the text written between columns.
    #[must_use]
    pub fn separator(self, separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..self
        }
    }

    /// Only logs timers up to this hierarchy level. 0 logs every level.
    #[must_use]
    pub fn max_level(self, max_level: usize) -> Self {
        Self { max_level, ..self }
    }

    /// Sets the application-defined time written in the first column of the line.
    #[must_use]
    pub fn simulation_time(self, simulation_time: f64) -> Self {
        Self {
            simulation_time,
            ..self
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.file_prefix
    }

    pub(crate) fn separator_str(&self) -> &str {
        &self.separator
    }

    pub(crate) fn level_limit(&self) -> usize {
        self.max_level
    }

    pub(crate) fn user_time(&self) -> f64 {
        self.simulation_time
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::new()
    }
}
