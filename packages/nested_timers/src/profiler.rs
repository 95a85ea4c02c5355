use std::fs;
use std::path::PathBuf;

use tracing::{debug, error};

use crate::aggregate::{self, Snapshot};
use crate::node::Accumulation;
use crate::report::ReportContext;
use crate::tree::TimerTree;
use crate::{
    Communicator, Error, Fingerprint, LogOptions, PrintOptions, ProfilerBuilder, ReduceOp, Report,
    ReportStyle, Result, Timer, TimerId, TimerOptions, WorkUnitRule, log_report,
};

// Color of the workers that lead their subgroup when the leaders split off.
const LEADER: u64 = 1;
const FOLLOWER: u64 = 0;

/// Hierarchical wall-clock timers of one worker.
///
/// Timers form a tree: starting a timer by label opens the child of the current timer with that
/// label, creating it on first use. Every thread of the [`ThreadTeam`][crate::ThreadTeam] has
/// its own position in the tree, so the same profiler can be shared by all threads of a worker.
///
/// The statistics of all workers of a group are combined by the collective operations
/// [`report()`][Self::report], [`print()`][Self::print] and [`print_log()`][Self::print_log].
/// Workers whose trees differ are reported separately, one report per distinct tree.
///
/// # Examples
///
/// ```
/// use nested_timers::Profiler;
///
/// let profiler = Profiler::new();
///
/// profiler.start("simulation").unwrap();
///
/// for _ in 0..3 {
///     profiler.start("step").unwrap();
///     profiler.stop_with_units("step", 1000.0, "cells").unwrap();
/// }
///
/// profiler.stop("simulation").unwrap();
/// ```
#[derive(Debug)]
pub struct Profiler {
    tree: TimerTree,
    work_unit_rule: WorkUnitRule,
    report_styles: Vec<ReportStyle>,
}

impl Profiler {
    /// Creates a single-threaded profiler with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a profiler with custom settings.
    #[must_use]
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::new()
    }

    pub(crate) fn new_inner(
        tree: TimerTree,
        work_unit_rule: WorkUnitRule,
        report_styles: Vec<ReportStyle>,
    ) -> Self {
        Self {
            tree,
            work_unit_rule,
            report_styles,
        }
    }

    /// Number of threads in the team, fixed when the profiler was built.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.tree.threads()
    }

    /// Resolution of the clock, in seconds.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.tree.resolution()
    }

    /// The report styles written by [`print()`][Self::print].
    #[must_use]
    pub fn report_styles(&self) -> &[ReportStyle] {
        &self.report_styles
    }

    /// Returns the id of the child of the current timer with the given label, creating the
    /// child with the given options if it does not exist yet.
    ///
    /// The timer is not started. Starting and stopping by id skips the label lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the calling thread is not part of the team.
    pub fn initialize_timer(&self, label: &str, options: &TimerOptions) -> Result<TimerId> {
        self.tree.initialize_or_get_child(label, options)
    }

    /// Returns the id of the child of the current timer with the given label, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the calling thread is not part of the team.
    pub fn child_id(&self, label: &str) -> Result<Option<TimerId>> {
        self.tree.child_id(label)
    }

    /// Returns the id of the innermost open timer of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the calling thread is not part of the team.
    pub fn current_id(&self) -> Result<TimerId> {
        self.tree.current_id()
    }

    /// Returns the labels from the root down to the given timer, e.g. `/simulation/step`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer does not exist.
    pub fn full_label(&self, id: TimerId) -> Result<String> {
        self.tree.full_label(id)
    }

    /// Identifies the structure of this worker's timer tree.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.tree.fingerprint()
    }

    /// Starts the child of the current timer with the given label, creating it on first use.
    ///
    /// Outside a parallel region every thread of the team moves to the new timer; inside one,
    /// only the calling thread moves.
    ///
    /// # Errors
    ///
    /// Returns an error if the calling thread is not part of the team.
    pub fn start(&self, label: &str) -> Result<TimerId> {
        self.tree.start_label(label)
    }

    /// Starts a timer by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer does not exist or, with validation enabled, if it is not a
    /// child of the current timer.
    pub fn start_id(&self, id: TimerId) -> Result<()> {
        self.tree.start_id(id)
    }

    /// Stops the current timer.
    ///
    /// # Errors
    ///
    /// Returns an error if no timer is open or, with validation enabled, if the current timer
    /// has a different label.
    pub fn stop(&self, label: &str) -> Result<()> {
        self.tree.stop_label(label, None, None)
    }

    /// Stops the current timer and records the amount of work done in the interval.
    ///
    /// The first stop that records work units fixes the unit label of the timer, unless the
    /// timer was created with one.
    ///
    /// # Errors
    ///
    /// Returns an error if no timer is open or, with validation enabled, if the current timer
    /// has a different label.
    pub fn stop_with_units(
        &self,
        label: &str,
        work_units: f64,
        work_unit_label: &str,
    ) -> Result<()> {
        self.tree
            .stop_label(label, Some(work_units), Some(work_unit_label))
    }

    /// Stops a timer by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer does not exist, if it is the root timer or, with
    /// validation enabled, if it is not the current timer.
    pub fn stop_id(&self, id: TimerId) -> Result<()> {
        self.tree.stop_id(id, None, None)
    }

    /// Stops a timer by id and records the amount of work done in the interval, in the unit
    /// the timer was created with.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer does not exist, if it is the root timer or, with
    /// validation enabled, if it is not the current timer.
    pub fn stop_id_with_units(&self, id: TimerId, work_units: f64) -> Result<()> {
        self.tree.stop_id(id, Some(work_units), None)
    }

    /// Stops a timer by id and records the amount of work done in the interval in the given
    /// unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer does not exist, if it is the root timer or, with
    /// validation enabled, if it is not the current timer.
    pub fn stop_id_with_units_label(
        &self,
        id: TimerId,
        work_units: f64,
        work_unit_label: &str,
    ) -> Result<()> {
        self.tree
            .stop_id(id, Some(work_units), Some(work_unit_label))
    }

    /// Starts the child of the current timer with the given label and returns a guard that
    /// stops it when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the calling thread is not part of the team.
    ///
    /// # Examples
    ///
    /// ```
    /// use nested_timers::Profiler;
    ///
    /// let profiler = Profiler::new();
    ///
    /// {
    ///     let _timer = profiler.timer("load").unwrap();
    ///     // Timed work.
    /// }
    ///
    /// let load = profiler.child_id("load").unwrap().unwrap();
    /// assert_eq!(profiler.full_label(load).unwrap(), "/load");
    /// ```
    pub fn timer(&self, label: &str) -> Result<Timer<'_>> {
        let id = self.start(label)?;
        Ok(Timer::new(self, id))
    }

    /// Starts a timer by id and returns a guard that stops it when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer does not exist or, with validation enabled, if it is not a
    /// child of the current timer.
    pub fn timer_id(&self, id: TimerId) -> Result<Timer<'_>> {
        self.start_id(id)?;
        Ok(Timer::new(self, id))
    }

    /// Aggregates the timers of all workers in `comm` without writing any file.
    ///
    /// This is a collective operation: every worker of `comm` must call it. Workers are
    /// partitioned into subgroups with identical timer trees and each subgroup is aggregated
    /// separately. The first worker of each subgroup receives `Some(report)`, all others `None`.
    /// Timers that take less than `min_fraction` of the total time are omitted.
    ///
    /// Open timers are included up to the moment the operation started, and the time spent in
    /// the operation is removed from them afterwards.
    ///
    /// # Errors
    ///
    /// Returns the local error if this worker failed, or [`Error::PeerFailed`] if another worker
    /// failed. Either way, every worker returns an error.
    pub fn report<C: Communicator>(&self, comm: &C, min_fraction: f64) -> Result<Option<Report>> {
        let start = self.tree.now();
        comm.barrier()?;

        let outcome = self.aggregate(
            comm,
            Accumulation::Cumulative,
            start,
            min_fraction,
            |_| Ok(()),
        );
        let outcome = Self::agree(comm, outcome)?;

        comm.barrier()?;
        let end = self.tree.now();
        self.tree.shift_start_time(Accumulation::Cumulative, end - start);
        self.tree.shift_start_time(Accumulation::Interval, end - start);

        outcome
    }

    /// Aggregates the timers of all workers in `comm` and writes one report file per subgroup
    /// of workers with identical timer trees.
    ///
    /// This is a collective operation: every worker of `comm` must call it. The file of
    /// subgroup `i` is `<prefix>_<i>.txt`, written by the first worker of the subgroup. The
    /// largest subgroup has index 0. The file contains one section per configured
    /// [`ReportStyle`].
    ///
    /// # Errors
    ///
    /// Returns the local error if this worker failed, or [`Error::PeerFailed`] if another worker
    /// failed. Either way, every worker returns an error.
    pub fn print<C: Communicator>(&self, comm: &C, options: &PrintOptions) -> Result<()> {
        let start = self.tree.now();
        comm.barrier()?;

        let outcome = self.aggregate(
            comm,
            Accumulation::Cumulative,
            start,
            options.fraction(),
            |report| self.write_report(report, options).map(|_| ()),
        );
        let outcome = Self::agree(comm, outcome)?;

        comm.barrier()?;
        let end = self.tree.now();
        self.tree.shift_start_time(Accumulation::Cumulative, end - start);
        self.tree.shift_start_time(Accumulation::Interval, end - start);

        outcome.map(|_| ())
    }

    /// Aggregates the timers of all workers in `comm` since the previous log snapshot and
    /// appends one line per subgroup to `<prefix>_<fingerprint>.txt`.
    ///
    /// This is a collective operation: every worker of `comm` must call it. A header describing
    /// the columns is written when the file is created. Afterwards the interval statistics
    /// start over, while the statistics used by [`print()`][Self::print] are kept.
    ///
    /// # Errors
    ///
    /// Returns the local error if this worker failed, or [`Error::PeerFailed`] if another worker
    /// failed. Either way, every worker returns an error.
    pub fn print_log<C: Communicator>(&self, comm: &C, options: &LogOptions) -> Result<()> {
        let start = self.tree.now();
        comm.barrier()?;

        let outcome = self.aggregate(
            comm,
            Accumulation::Interval,
            start,
            f64::NEG_INFINITY,
            |report| log_report::append(report, options).map(|_| ()),
        );
        let outcome = Self::agree(comm, outcome)?;

        comm.barrier()?;
        let end = self.tree.now();
        self.tree.shift_start_time(Accumulation::Cumulative, end - start);
        self.tree.reset(Accumulation::Interval, end);

        outcome.map(|_| ())
    }

    /// Forms the subgroups, reduces the statistics onto each subgroup leader and hands the
    /// resulting report to `finish` on the leader.
    fn aggregate<C, F>(
        &self,
        comm: &C,
        accumulation: Accumulation,
        now: f64,
        min_fraction: f64,
        finish: F,
    ) -> Result<Option<Report>>
    where
        C: Communicator,
        F: FnOnce(&Report) -> Result<()>,
    {
        let fingerprint = self.tree.fingerprint();

        let subgroup = comm.split(fingerprint.get(), 0)?;
        let is_leader = subgroup.rank() == 0;

        // Larger subgroups sort first among the leaders, so they get lower indexes.
        let size_key = i64::try_from(subgroup.size())
            .ok()
            .and_then(i64::checked_neg)
            .unwrap_or(i64::MIN);
        let leaders = comm.split(if is_leader { LEADER } else { FOLLOWER }, size_key)?;
        let leader_rank = i64::try_from(leaders.rank()).unwrap_or(i64::MAX);
        let subgroup_index = subgroup.broadcast_i64(leader_rank, 0)?;
        drop(leaders);

        debug!(
            %fingerprint,
            subgroup_index,
            workers = subgroup.size(),
            "formed report subgroup"
        );

        let node_count = i64::try_from(self.tree.node_count()).unwrap_or(i64::MAX);
        let min_timers = subgroup.all_reduce_i64(node_count, ReduceOp::Min)?;
        let max_timers = subgroup.all_reduce_i64(node_count, ReduceOp::Max)?;

        if min_timers != max_timers {
            return Err(Error::FingerprintCollision {
                min_timers,
                max_timers,
            });
        }

        let snapshot = Snapshot::capture(&self.tree.read_nodes(), accumulation, now);
        let statistics = aggregate::reduce(snapshot, &subgroup, comm.rank(), self.work_unit_rule)?;

        let Some(statistics) = statistics else {
            return Ok(None);
        };

        let report = Report::new(
            &statistics,
            ReportContext {
                subgroup_index: usize::try_from(subgroup_index).unwrap_or_default(),
                fingerprint,
                threads: self.threads(),
                resolution: self.resolution(),
                min_fraction,
            },
        );

        finish(&report)?;

        Ok(Some(report))
    }

    /// Makes every worker agree on whether the collective operation succeeded.
    fn agree<C: Communicator>(
        comm: &C,
        outcome: Result<Option<Report>>,
    ) -> Result<Result<Option<Report>>> {
        if let Err(error) = &outcome {
            error!(%error, rank = comm.rank(), "cannot produce profile report");
        }

        let all_succeeded = comm.all_reduce_i64(i64::from(outcome.is_ok()), ReduceOp::Min)? == 1;

        Ok(match outcome {
            Ok(_) if !all_succeeded => Err(Error::PeerFailed),
            outcome => outcome,
        })
    }

    fn write_report(&self, report: &Report, options: &PrintOptions) -> Result<PathBuf> {
        let path = PathBuf::from(format!(
            "{}_{}.txt",
            options.prefix(),
            report.subgroup_index()
        ));

        fs::write(&path, report.render_styles(&self.report_styles)).map_err(|source| {
            Error::Io {
                path: path.clone(),
                source,
            }
        })?;

        debug!(path = %path.display(), "wrote profile report");

        Ok(path)
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &TimerTree {
        &self.tree
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}
