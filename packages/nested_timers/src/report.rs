//! Reports assembled from timers aggregated over a group of workers.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::iter;

use crate::aggregate::{GroupStatistics, Statistics, TimerStatistics};
use crate::table::{Cell, Table, format_number};
use crate::{Fingerprint, RankedValue, ReportStyle};

/// Spaces of indentation per hierarchy level below the first.
const INDENT: usize = 2;

/// Timer statistics aggregated over all workers of a subgroup with identical timer trees.
///
/// Created by [`Profiler::report()`][crate::Profiler::report] on the first worker of each
/// subgroup. The rows follow the timer hierarchy in depth-first order, starting with the
/// children of the root timer, and only include timers that take at least the requested
/// fraction of the total time.
///
/// The [`Display`] implementation renders the [`ReportStyle::Full`] style.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use nested_timers::{LocalGroup, Profiler};
///
/// let reports = LocalGroup::new(NonZero::new(2).unwrap()).run(|comm| {
///     let profiler = Profiler::new();
///
///     profiler.start("compute").unwrap();
///     profiler.stop("compute").unwrap();
///
///     profiler.report(&comm, 0.0).unwrap()
/// });
///
/// let report = reports[0].as_ref().unwrap();
/// assert_eq!(report.workers(), 2);
/// assert_eq!(report.timers()[0].label(), "compute");
/// assert!(reports[1].is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Report {
    subgroup_index: usize,
    fingerprint: Fingerprint,
    workers: usize,
    threads: usize,
    resolution: f64,
    min_fraction: f64,
    timers: Vec<TimerRow>,
    groups: Vec<GroupRow>,
}

/// Where a report came from and how it was filtered.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReportContext {
    pub(crate) subgroup_index: usize,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) threads: usize,
    pub(crate) resolution: f64,
    pub(crate) min_fraction: f64,
}

impl Report {
    pub(crate) fn new(statistics: &Statistics, context: ReportContext) -> Self {
        let codes = group_codes(&statistics.groups);
        let workers = statistics.workers.max(1);

        let timers = statistics
            .timers
            .iter()
            .skip(1)
            .filter(|timer| timer.total_fraction >= context.min_fraction)
            .map(|timer| TimerRow::new(timer, workers, &codes))
            .collect();

        let groups = statistics
            .groups
            .iter()
            .filter(|group| group.total_fraction >= context.min_fraction)
            .map(|group| GroupRow::new(group, workers, &codes))
            .collect();

        Self {
            subgroup_index: context.subgroup_index,
            fingerprint: context.fingerprint,
            workers,
            threads: context.threads,
            resolution: context.resolution,
            min_fraction: context.min_fraction,
            timers,
            groups,
        }
    }

    /// Index of the subgroup of workers this report describes. The largest subgroup is 0.
    #[must_use]
    pub fn subgroup_index(&self) -> usize {
        self.subgroup_index
    }

    /// Fingerprint of the timer tree shared by all workers in the subgroup.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Number of workers in the subgroup.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of threads per worker.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Resolution of the clock that measured the times, in seconds.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Timers and groups below this fraction of the total time are omitted from the report.
    #[must_use]
    pub fn min_fraction(&self) -> f64 {
        self.min_fraction
    }

    /// One row per reported position in the timer tree, in depth-first order.
    #[must_use]
    pub fn timers(&self) -> &[TimerRow] {
        &self.timers
    }

    /// One row per reported group, sorted by group name.
    #[must_use]
    pub fn groups(&self) -> &[GroupRow] {
        &self.groups
    }

    /// Finds the group with the given name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupRow> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Renders the report in one style.
    #[must_use]
    pub fn render(&self, style: ReportStyle) -> String {
        self.render_styles(&[style])
    }

    /// Renders the report header once, followed by one section per style.
    #[must_use]
    pub fn render_styles(&self, styles: &[ReportStyle]) -> String {
        let tables = styles
            .iter()
            .map(|style| self.table(*style))
            .collect::<Vec<_>>();

        let width = tables.iter().map(Table::width).max().unwrap_or(0);

        let mut header = Table::new();
        header.rule();
        header.row(vec![Cell::left(format!(
            "Profile results with time fraction of total time larger than {}",
            format_number(self.min_fraction)
        ))]);
        header.row(vec![Cell::left(format!(
            "Processes in set of timers {} with (up to) {} threads",
            self.workers, self.threads
        ))]);
        header.row(vec![Cell::left(format!(
            "Timer resolution is {}",
            format_number(self.resolution)
        ))]);
        header.rule();

        let width = width.max(header.width());

        let mut output = header.render_with_width(width);

        for table in &tables {
            output.push_str(&table.render_with_width(width));
        }

        output
    }

    fn table(&self, style: ReportStyle) -> Table {
        let mut table = Table::new();

        match style {
            ReportStyle::Groups => self.standalone_group_table(&mut table),
            ReportStyle::Compact => self.timer_table(&mut table, Columns::compact()),
            ReportStyle::Full => {
                self.timer_table(&mut table, Columns::full());
                self.group_section(&mut table);
            }
            ReportStyle::Detailed => {
                self.timer_table(&mut table, Columns::detailed());
                self.group_section(&mut table);
            }
        }

        table.rule();
        table
    }

    fn timer_table(&self, table: &mut Table, columns: Columns) {
        table.titled_rule("Profile");

        let mut spans = vec![Cell::empty().spanning(3)];
        let mut names = vec![Cell::left("Level"), Cell::left("Groups"), Cell::left("Label")];

        if columns.statistics {
            spans.push(Cell::left("Threads"));
            names.push(Cell::right("Average"));
        }

        spans.push(Cell::left("Time(s)").spanning(columns.time_columns()));
        names.push(Cell::right("Average"));
        names.push(Cell::right("parent %"));

        if columns.statistics {
            names.extend([
                Cell::right("Maximum"),
                Cell::right("Rank"),
                Cell::right("Minimum"),
                Cell::right("Rank"),
            ]);
        }

        spans.push(Cell::left("Calls"));
        names.push(Cell::right("Average"));

        if columns.imbalance {
            spans.push(Cell::left("Imbalance").spanning(3));
            names.extend([
                Cell::right("Average"),
                Cell::right("Maximum"),
                Cell::right("Minimum"),
            ]);
        }

        if columns.statistics {
            spans.push(Cell::left("Workunit-rate").spanning(3));
            names.extend([
                Cell::right("Average"),
                Cell::right("Per process"),
                Cell::left("Unit"),
            ]);
        }

        table.row(spans);
        table.row(names);

        for timer in &self.timers {
            table.row(timer.cells(columns));
        }
    }

    // Group rows aligned with the time columns of the full timer table.
    fn group_section(&self, table: &mut Table) {
        table.titled_rule("Groups");

        for group in &self.groups {
            table.row(vec![
                Cell::empty(),
                Cell::left(group.code.clone()),
                Cell::left(group.name.clone()),
                Cell::empty(),
                Cell::right(format_number(group.time_average)),
                Cell::right(format_number(group.total_percent)),
                Cell::right(format_number(group.time_max.value())),
                Cell::right(group.time_max.rank().to_string()),
                Cell::right(format_number(group.time_min.value())),
                Cell::right(group.time_min.rank().to_string()),
            ]);
        }
    }

    fn standalone_group_table(&self, table: &mut Table) {
        table.titled_rule("Groups");

        table.row(vec![
            Cell::empty().spanning(2),
            Cell::left("Time(s)").spanning(6),
        ]);
        table.row(vec![
            Cell::left("Id"),
            Cell::left("Group"),
            Cell::right("Average"),
            Cell::right("total %"),
            Cell::right("Maximum"),
            Cell::right("Rank"),
            Cell::right("Minimum"),
            Cell::right("Rank"),
        ]);

        for group in &self.groups {
            table.row(vec![
                Cell::left(group.code.clone()),
                Cell::left(group.name.clone()),
                Cell::right(format_number(group.time_average)),
                Cell::right(format_number(group.total_percent)),
                Cell::right(format_number(group.time_max.value())),
                Cell::right(group.time_max.rank().to_string()),
                Cell::right(format_number(group.time_min.value())),
                Cell::right(group.time_min.rank().to_string()),
            ]);
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(ReportStyle::Full))
    }
}

#[derive(Clone, Copy, Debug)]
struct Columns {
    // Threads, extremes with ranks and throughput.
    statistics: bool,
    imbalance: bool,
}

impl Columns {
    const fn compact() -> Self {
        Self {
            statistics: false,
            imbalance: false,
        }
    }

    const fn full() -> Self {
        Self {
            statistics: true,
            imbalance: false,
        }
    }

    const fn detailed() -> Self {
        Self {
            statistics: true,
            imbalance: true,
        }
    }

    const fn time_columns(self) -> usize {
        if self.statistics { 6 } else { 2 }
    }
}

/// Assigns `A`..`Z`, then `a`..`z` to groups in name order.
fn group_codes(groups: &[GroupStatistics]) -> HashMap<String, String> {
    groups
        .iter()
        .zip(
            ('A'..='Z')
                .chain('a'..='z')
                .map(String::from)
                .chain(iter::repeat_with(|| "?".to_string())),
        )
        .map(|(group, code)| (group.name.clone(), code))
        .collect()
}

/// One position in the timer tree of a [`Report`].
#[derive(Clone, Debug)]
pub struct TimerRow {
    level: usize,
    group_codes: String,
    label: String,
    is_other: bool,
    threads_average: f64,
    time_average: f64,
    parent_percent: f64,
    total_fraction: f64,
    time_max: RankedValue,
    time_min: RankedValue,
    calls_average: f64,
    imbalance: Option<Imbalance>,
    throughput: Option<Throughput>,
}

impl TimerRow {
    #[expect(
        clippy::cast_precision_loss,
        reason = "worker and thread counts stay far below the precision limit of f64"
    )]
    fn new(timer: &TimerStatistics, workers: usize, codes: &HashMap<String, String>) -> Self {
        let n = workers as f64;

        let throughput = timer.has_work_units.then(|| {
            let (total, per_worker) = if timer.time_sum > 0.0 {
                let per_worker = timer.work_units_sum / timer.time_sum;
                (Rate::Finite(n * per_worker), Rate::Finite(per_worker))
            } else if timer.work_units_sum > 0.0 {
                (Rate::Infinite, Rate::Infinite)
            } else {
                (Rate::Finite(0.0), Rate::Finite(0.0))
            };

            Throughput {
                total,
                per_worker,
                unit: timer.entry.work_unit_label.clone(),
            }
        });

        Self {
            level: timer.entry.level,
            group_codes: timer
                .entry
                .groups
                .iter()
                .filter_map(|group| codes.get(group).map(String::as_str))
                .collect(),
            label: timer.entry.label.clone(),
            is_other: timer.entry.is_other(),
            threads_average: timer.threads_sum as f64 / n,
            time_average: timer.time_sum / n,
            parent_percent: 100.0 * timer.parent_fraction,
            total_fraction: timer.total_fraction,
            time_max: timer.time_max,
            time_min: timer.time_min,
            calls_average: timer.count_sum / n,
            imbalance: timer.imbalance.map(|imbalance| Imbalance {
                average: imbalance.sum / n,
                max: imbalance.max,
                min: imbalance.min,
            }),
            throughput,
        }
    }

    /// Depth in the timer hierarchy. Children of the root timer are at level 1.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Codes of the groups the timer belongs to, e.g. `"AC"`.
    #[must_use]
    pub fn group_codes(&self) -> &str {
        &self.group_codes
    }

    /// The timer label, or `"Other"` for the self-time of the parent timer.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this row is the self-time of its parent rather than a timer.
    #[must_use]
    pub fn is_other(&self) -> bool {
        self.is_other
    }

    /// Average over workers of the number of threads that ran the timer.
    #[must_use]
    pub fn threads_average(&self) -> f64 {
        self.threads_average
    }

    /// Average over workers of the time, in seconds.
    #[must_use]
    pub fn time_average(&self) -> f64 {
        self.time_average
    }

    /// Time as a percentage of the parent timer's time.
    #[must_use]
    pub fn parent_percent(&self) -> f64 {
        self.parent_percent
    }

    /// Time as a fraction of the root timer's time.
    #[must_use]
    pub fn total_fraction(&self) -> f64 {
        self.total_fraction
    }

    /// Largest time of any worker and the rank of that worker.
    #[must_use]
    pub fn time_max(&self) -> RankedValue {
        self.time_max
    }

    /// Smallest time of any worker and the rank of that worker.
    #[must_use]
    pub fn time_min(&self) -> RankedValue {
        self.time_min
    }

    /// Average over workers of the number of completed intervals.
    #[must_use]
    pub fn calls_average(&self) -> f64 {
        self.calls_average
    }

    /// Thread imbalance of the timer. `None` for `"Other"` rows.
    #[must_use]
    pub fn imbalance(&self) -> Option<Imbalance> {
        self.imbalance
    }

    /// Work unit throughput, if work units were reported for the timer.
    #[must_use]
    pub fn throughput(&self) -> Option<&Throughput> {
        self.throughput.as_ref()
    }

    fn cells(&self, columns: Columns) -> Vec<Cell> {
        let indent = " ".repeat(INDENT.saturating_mul(self.level.saturating_sub(1)));

        let mut cells = vec![
            Cell::right(self.level.to_string()),
            Cell::left(self.group_codes.clone()),
            Cell::left(format!("{indent}{}", self.label)),
        ];

        if columns.statistics {
            cells.push(Cell::right(format_number(self.threads_average)));
        }

        cells.push(Cell::right(format_number(self.time_average)));
        cells.push(Cell::right(format_number(self.parent_percent)));

        if columns.statistics {
            cells.extend([
                Cell::right(format_number(self.time_max.value())),
                Cell::right(self.time_max.rank().to_string()),
                Cell::right(format_number(self.time_min.value())),
                Cell::right(self.time_min.rank().to_string()),
            ]);
        }

        cells.push(Cell::right(format_number(self.calls_average)));

        if columns.imbalance {
            match self.imbalance {
                Some(imbalance) => cells.extend([
                    Cell::right(format_number(imbalance.average)),
                    Cell::right(format_number(imbalance.max)),
                    Cell::right(format_number(imbalance.min)),
                ]),
                None => cells.extend([Cell::empty(), Cell::empty(), Cell::empty()]),
            }
        }

        if columns.statistics {
            if let Some(throughput) = &self.throughput {
                cells.extend([
                    Cell::right(throughput.total.to_string()),
                    Cell::right(throughput.per_worker.to_string()),
                    Cell::left(format!("{}/s", throughput.unit)),
                ]);
            }
        }

        cells
    }
}

/// Thread imbalance of one timer: `(max - average) / max * n / (n - 1)` over the threads of a
/// worker, which is 0 for perfectly balanced threads and 1 when only one thread worked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Imbalance {
    average: f64,
    max: f64,
    min: f64,
}

impl Imbalance {
    /// Average imbalance over workers.
    #[must_use]
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Largest imbalance of any worker.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Smallest imbalance of any worker.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }
}

/// Work units processed per second by one timer.
#[derive(Clone, Debug, PartialEq)]
pub struct Throughput {
    total: Rate,
    per_worker: Rate,
    unit: String,
}

impl Throughput {
    /// Rate of all workers together.
    #[must_use]
    pub fn total(&self) -> Rate {
        self.total
    }

    /// Average rate of one worker.
    #[must_use]
    pub fn per_worker(&self) -> Rate {
        self.per_worker
    }

    /// The work unit label, e.g. `"cells"`.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }
}

/// A work unit rate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Rate {
    /// Work units per second.
    Finite(f64),

    /// Work units were processed in no measurable time.
    Infinite,
}

impl Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(rate) => f.write_str(&format_number(*rate)),
            Self::Infinite => f.write_str("inf"),
        }
    }
}

/// One user-defined group of a [`Report`].
#[derive(Clone, Debug)]
pub struct GroupRow {
    code: String,
    name: String,
    time_average: f64,
    total_percent: f64,
    time_max: RankedValue,
    time_min: RankedValue,
}

impl GroupRow {
    #[expect(
        clippy::cast_precision_loss,
        reason = "worker counts stay far below the precision limit of f64"
    )]
    fn new(group: &GroupStatistics, workers: usize, codes: &HashMap<String, String>) -> Self {
        Self {
            code: codes.get(&group.name).cloned().unwrap_or_default(),
            name: group.name.clone(),
            time_average: group.time_sum / workers as f64,
            total_percent: 100.0 * group.total_fraction,
            time_max: group.time_max,
            time_min: group.time_min,
        }
    }

    /// The code that marks timers of this group in the timer rows.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Average over workers of the time spent in timers of the group, in seconds.
    #[must_use]
    pub fn time_average(&self) -> f64 {
        self.time_average
    }

    /// Time as a percentage of the total time.
    #[must_use]
    pub fn total_percent(&self) -> f64 {
        self.total_percent
    }

    /// Largest group time of any worker and the rank of that worker.
    #[must_use]
    pub fn time_max(&self) -> RankedValue {
        self.time_max
    }

    /// Smallest group time of any worker and the rank of that worker.
    #[must_use]
    pub fn time_min(&self) -> RankedValue {
        self.time_min
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::indexing_slicing, reason = "panics are acceptable in tests")]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values")]

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::aggregate::{Entry, ImbalanceStatistics};
    use crate::TimerId;

    assert_impl_all!(Report: Send, Sync);
    assert_impl_all!(TimerRow: Send, Sync);

    fn entry(id: Option<usize>, label: &str, level: usize, groups: &[&str], unit: &str) -> Entry {
        Entry {
            id: id.map(TimerId::new),
            label: label.to_string(),
            level,
            groups: groups.iter().map(ToString::to_string).collect(),
            work_unit_label: unit.to_string(),
            parent_index: 0,
        }
    }

    fn timer(entry: Entry, time_sum: f64, total_fraction: f64) -> TimerStatistics {
        let imbalance = (!entry.is_other()).then_some(ImbalanceStatistics {
            sum: 0.5,
            max: 0.5,
            min: 0.0,
        });

        TimerStatistics {
            entry,
            time_sum,
            time_max: RankedValue::new(time_sum, 1),
            time_min: RankedValue::new(0.0, 0),
            count_sum: 4.0,
            threads_sum: 2,
            work_units_sum: 0.0,
            has_work_units: false,
            imbalance,
            total_fraction,
            parent_fraction: total_fraction,
        }
    }

    fn group(name: &str, time_sum: f64, total_fraction: f64) -> GroupStatistics {
        GroupStatistics {
            name: name.to_string(),
            time_sum,
            time_max: RankedValue::new(time_sum, 0),
            time_min: RankedValue::new(time_sum, 0),
            total_fraction,
        }
    }

    fn statistics() -> Statistics {
        let mut compute = timer(entry(Some(1), "compute", 1, &["MPI"], "cells"), 6.0, 0.6);
        compute.work_units_sum = 12.0;
        compute.has_work_units = true;

        let mut instant = timer(entry(Some(2), "instant", 1, &["IO", "MPI"], "bytes"), 0.0, 0.0);
        instant.work_units_sum = 5.0;
        instant.has_work_units = true;

        Statistics {
            workers: 2,
            timers: vec![
                timer(entry(Some(0), "total", 0, &["Total"], ""), 10.0, 1.0),
                compute,
                instant,
                timer(entry(None, "Other", 1, &[], ""), 4.0, 0.4),
            ],
            groups: vec![
                group("IO", 0.0, 0.0),
                group("MPI", 6.0, 0.6),
                group("Total", 10.0, 1.0),
            ],
        }
    }

    fn context(min_fraction: f64) -> ReportContext {
        ReportContext {
            subgroup_index: 0,
            fingerprint: Fingerprint::of_tree(&[]),
            threads: 1,
            resolution: 1e-9,
            min_fraction,
        }
    }

    #[test]
    fn rows_skip_root_and_average_over_workers() {
        let report = Report::new(&statistics(), context(0.0));

        let labels = report.timers().iter().map(TimerRow::label).collect::<Vec<_>>();
        assert_eq!(labels, ["compute", "instant", "Other"]);

        let compute = &report.timers()[0];
        assert_eq!(compute.time_average(), 3.0);
        assert_eq!(compute.calls_average(), 2.0);
        assert_eq!(compute.threads_average(), 1.0);
        assert_eq!(compute.parent_percent(), 60.0);
        assert_eq!(compute.group_codes(), "B");
        assert_eq!(compute.imbalance().unwrap().average(), 0.25);

        let throughput = compute.throughput().unwrap();
        assert_eq!(throughput.total(), Rate::Finite(4.0));
        assert_eq!(throughput.per_worker(), Rate::Finite(2.0));
        assert_eq!(throughput.unit(), "cells");

        let other = &report.timers()[2];
        assert!(other.is_other());
        assert!(other.imbalance().is_none());
        assert!(other.throughput().is_none());
    }

    #[test]
    fn units_in_zero_time_are_infinite() {
        let report = Report::new(&statistics(), context(0.0));

        let instant = &report.timers()[1];
        assert_eq!(instant.group_codes(), "AB");
        assert_eq!(instant.throughput().unwrap().total(), Rate::Infinite);
        assert_eq!(Rate::Infinite.to_string(), "inf");
    }

    #[test]
    fn min_fraction_filters_timers_and_groups() {
        let report = Report::new(&statistics(), context(0.5));

        let labels = report.timers().iter().map(TimerRow::label).collect::<Vec<_>>();
        assert_eq!(labels, ["compute"]);

        let groups = report.groups().iter().map(GroupRow::name).collect::<Vec<_>>();
        assert_eq!(groups, ["MPI", "Total"]);
        assert_eq!(report.group("Total").unwrap().code(), "C");
        assert_eq!(report.group("Total").unwrap().time_average(), 5.0);
    }

    #[test]
    fn full_rendering_lists_timers_and_groups() {
        let report = Report::new(&statistics(), context(0.0));

        let text = report.to_string();
        assert!(text.contains("Profile results with time fraction of total time larger than 0"));
        assert!(text.contains("Processes in set of timers 2 with (up to) 1 threads"));
        assert!(text.contains(" Profile "));
        assert!(text.contains(" Groups "));
        assert!(text.contains("compute"));
        assert!(text.contains("cells/s"));
        assert!(text.contains("inf"));
        assert!(text.contains("Total"));
    }

    #[test]
    fn styles_select_sections() {
        let report = Report::new(&statistics(), context(0.0));

        let groups_only = report.render(ReportStyle::Groups);
        assert!(!groups_only.contains("compute"));
        assert!(groups_only.contains("MPI"));

        let compact = report.render(ReportStyle::Compact);
        assert!(compact.contains("compute"));
        assert!(!compact.contains("cells/s"));
        assert!(!compact.contains("Imbalance"));

        let detailed = report.render(ReportStyle::Detailed);
        assert!(detailed.contains("Imbalance"));

        let both = report.render_styles(&[ReportStyle::Compact, ReportStyle::Groups]);
        assert_eq!(both.matches("Timer resolution").count(), 1);
    }

    #[test]
    fn group_codes_continue_in_lowercase() {
        let groups = (0..30)
            .map(|index| group(&format!("g{index:02}"), 1.0, 0.1))
            .collect::<Vec<_>>();

        let codes = group_codes(&groups);
        assert_eq!(codes["g00"], "A");
        assert_eq!(codes["g25"], "Z");
        assert_eq!(codes["g26"], "a");
    }
}
