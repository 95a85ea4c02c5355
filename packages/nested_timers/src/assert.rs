//! Fatal assertions that report the timer position of the failing thread.

use std::process;

use tracing::error;

use crate::Profiler;

/// Aborts the process if the condition does not hold, reporting the condition (or a custom
/// message), the source location and the current timer of the calling thread.
///
/// This is for invariants of the calling program whose violation makes continuing pointless.
/// The whole process terminates immediately without unwinding; in a multi-process job, the job
/// launcher is expected to tear down the other workers.
///
/// # Examples
///
/// ```
/// use nested_timers::{Profiler, fatal_assert};
///
/// let profiler = Profiler::new();
/// let cells = 16;
///
/// fatal_assert!(profiler, cells > 0);
/// fatal_assert!(profiler, cells % 2 == 0, "odd cell count {cells}");
/// ```
#[macro_export]
macro_rules! fatal_assert {
    ($profiler:expr, $condition:expr $(,)?) => {
        $profiler.fatal_assert($condition, stringify!($condition), file!(), line!())
    };
    ($profiler:expr, $condition:expr, $($message:tt)+) => {
        $profiler.fatal_assert($condition, &format!($($message)+), file!(), line!())
    };
}

impl Profiler {
    /// Aborts the process if `condition` is false.
    ///
    /// Prefer the [`fatal_assert!`][crate::fatal_assert] macro, which fills in the message and
    /// source location.
    #[cfg_attr(test, mutants::skip)] // Aborting cannot be observed from a test.
    pub fn fatal_assert(&self, condition: bool, message: &str, file: &str, line: u32) {
        if condition {
            return;
        }

        let text = self.failure_message(message, file, line);

        error!(%text, "fatal assertion failed");
        eprintln!("{text}");

        process::abort();
    }

    fn failure_message(&self, message: &str, file: &str, line: u32) -> String {
        let position = self
            .current_id()
            .and_then(|id| self.full_label(id))
            .map_or_else(
                |_| "<unknown>".to_string(),
                |label| if label.is_empty() { "/".to_string() } else { label },
            );

        format!("ASSERT {file}:{line}: {message} (in timer {position})")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn message_includes_location_and_timer() {
        let profiler = Profiler::new();
        profiler.start("solve").unwrap();
        profiler.start("step").unwrap();

        assert_eq!(
            profiler.failure_message("x > 0", "main.rs", 12),
            "ASSERT main.rs:12: x > 0 (in timer /solve/step)"
        );
    }

    #[test]
    fn message_at_root() {
        let profiler = Profiler::new();

        assert_eq!(
            profiler.failure_message("ok", "lib.rs", 1),
            "ASSERT lib.rs:1: ok (in timer /)"
        );
    }

    #[test]
    fn holding_condition_returns() {
        let profiler = Profiler::new();
        let value = 3;

        fatal_assert!(profiler, value == 3);
        fatal_assert!(profiler, value > 1, "value {value} too small");
    }
}
