use std::sync::Arc;

#[cfg(test)]
use crate::pal::FakeClock;
use crate::pal::{Clock, ClockFacade};
use crate::tree::TimerTree;
use crate::{Profiler, ReportStyle, SingleThreaded, ThreadTeam, WorkUnitRule};

/// Creates instances of [`Profiler`].
///
/// All parameters are optional. Use `Profiler::builder()` to create a new instance of this
/// builder.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use nested_timers::{Profiler, ReportStyle, ScopedTeam, WorkUnitRule};
///
/// let profiler = Profiler::builder()
///     .team(ScopedTeam::new(NonZero::new(4).unwrap()))
///     .validate(true)
///     .work_unit_rule(WorkUnitRule::AllWorkers)
///     .report_styles(vec![ReportStyle::Compact, ReportStyle::Groups])
///     .build();
///
/// assert_eq!(profiler.threads(), 4);
/// ```
#[derive(Debug)]
pub struct ProfilerBuilder {
    team: Arc<dyn ThreadTeam>,
    clock: ClockFacade,

    /// Defaults to enabled in debug builds.
    validate: bool,

    work_unit_rule: WorkUnitRule,

    /// `None` reads the styles from the environment when the profiler is built.
    report_styles: Option<Vec<ReportStyle>>,
}

impl ProfilerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            team: Arc::new(SingleThreaded),
            clock: ClockFacade::real(),
            validate: cfg!(debug_assertions),
            work_unit_rule: WorkUnitRule::default(),
            report_styles: None,
        }
    }

    /// Sets the team of threads that may use the profiler concurrently.
    ///
    /// The number of threads is fixed for the lifetime of the profiler. Defaults to
    /// [`SingleThreaded`].
    #[must_use]
    pub fn team(self, team: impl ThreadTeam) -> Self {
        Self {
            team: Arc::new(team),
            ..self
        }
    }

    /// Sets the clock that measures timer intervals. Defaults to
    /// [`MonotonicClock`][crate::MonotonicClock].
    #[must_use]
    pub fn clock(self, clock: impl Clock) -> Self {
        Self {
            clock: ClockFacade::custom(clock),
            ..self
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn fake_clock(self, clock: FakeClock) -> Self {
        Self {
            clock: ClockFacade::fake(clock),
            ..self
        }
    }

    /// Enables detection of unbalanced instrumentation.
    ///
    /// When enabled, starting a timer that is not a child of the current timer and stopping a
    /// timer that is not the current timer fail with an error. When disabled, these checks are
    /// skipped. Defaults to enabled in debug builds and disabled in release builds.
    #[must_use]
    pub fn validate(self, validate: bool) -> Self {
        Self { validate, ..self }
    }

    /// Sets the rule that decides for which timers reports show work unit throughput.
    #[must_use]
    pub fn work_unit_rule(self, work_unit_rule: WorkUnitRule) -> Self {
        Self {
            work_unit_rule,
            ..self
        }
    }

    /// Sets the styles written by [`Profiler::print()`].
    ///
    /// Defaults to the styles listed in the
    /// [`NESTED_TIMERS_REPORT_STYLES`][crate::REPORT_STYLES_ENV] environment variable.
    #[must_use]
    pub fn report_styles(self, report_styles: Vec<ReportStyle>) -> Self {
        Self {
            report_styles: Some(report_styles),
            ..self
        }
    }

    /// Creates the profiler and starts its root timer on every thread of the team.
    #[must_use]
    pub fn build(self) -> Profiler {
        let report_styles = match self.report_styles {
            Some(styles) if !styles.is_empty() => styles,
            _ => ReportStyle::from_env(),
        };

        Profiler::new_inner(
            TimerTree::new(self.team, self.clock, self.validate),
            self.work_unit_rule,
            report_styles,
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::num::NonZero;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{ScopedTeam, TimerId};

    assert_impl_all!(ProfilerBuilder: Send, Sync);

    #[test]
    fn defaults_to_single_thread() {
        let profiler = ProfilerBuilder::new().build();

        assert_eq!(profiler.threads(), 1);
    }

    #[test]
    fn team_sets_thread_count() {
        let profiler = Profiler::builder()
            .team(ScopedTeam::new(NonZero::new(3).unwrap()))
            .build();

        assert_eq!(profiler.threads(), 3);
    }

    #[test]
    fn explicit_styles_win() {
        let profiler = Profiler::builder()
            .report_styles(vec![ReportStyle::Groups])
            .build();

        assert_eq!(profiler.report_styles(), [ReportStyle::Groups]);
    }

    #[test]
    fn validation_can_be_disabled() {
        let profiler = Profiler::builder().validate(false).build();

        profiler.start("a").unwrap();

        // Without validation the label of the stopped timer is not compared.
        profiler.stop("b").unwrap();
        assert_eq!(profiler.current_id().unwrap(), TimerId::ROOT);
    }
}
