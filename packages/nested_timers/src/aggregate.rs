use std::collections::BTreeSet;

use crate::node::{Accumulation, TimerNode};
use crate::{Communicator, RankedOp, RankedValue, ReduceOp, Result, TimerId};

/// Rank in the subgroup that receives the aggregated statistics.
pub(crate) const AGGREGATION_ROOT: usize = 0;

/// Label of the synthetic entry that holds the self-time of a timer with children.
pub(crate) const OTHER_LABEL: &str = "Other";

/// Name of the group carried by the root timer.
pub(crate) const TOTAL_GROUP: &str = "Total";

// Reduction placeholder for values that do not exist, e.g. the imbalance of "Other".
const UNDEFINED: f64 = -1.0;

/// Decides for which timers the report shows work unit throughput.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum WorkUnitRule {
    /// Throughput is shown when the work units summed over all workers are positive.
    #[default]
    PositiveSum,

    /// Throughput is shown when every worker reported work units on every stop
    /// and their sum is positive.
    AllWorkers,
}

impl WorkUnitRule {
    fn has_work_units(self, sum: f64, min: f64) -> bool {
        match self {
            Self::PositiveSum => sum > 0.0,
            Self::AllWorkers => min >= 0.0 && sum > 0.0,
        }
    }
}

/// Structural description of one position in the flattened timer tree.
#[derive(Clone, Debug)]
pub(crate) struct Entry {
    /// `None` for the synthetic "Other" entry.
    pub(crate) id: Option<TimerId>,
    pub(crate) label: String,
    pub(crate) level: usize,
    pub(crate) groups: Vec<String>,
    pub(crate) work_unit_label: String,

    /// Index of the parent entry. The root is its own parent.
    pub(crate) parent_index: usize,
}

impl Entry {
    pub(crate) fn is_other(&self) -> bool {
        self.id.is_none()
    }
}

/// The local per-position values of one worker, in depth-first pre-order with an "Other"
/// entry after the children of every timer that has children.
#[derive(Debug)]
pub(crate) struct Snapshot {
    entries: Vec<Entry>,
    time: Vec<f64>,
    count: Vec<f64>,
    threads: Vec<i64>,
    work_units: Vec<f64>,
    imbalance: Vec<f64>,

    group_names: Vec<String>,
    group_time: Vec<f64>,
}

impl Snapshot {
    /// Captures one set of accumulators of every timer, extending open intervals up to `now`.
    pub(crate) fn capture(nodes: &[TimerNode], accumulation: Accumulation, now: f64) -> Self {
        let mut snapshot = Self {
            entries: Vec::with_capacity(nodes.len()),
            time: Vec::with_capacity(nodes.len()),
            count: Vec::with_capacity(nodes.len()),
            threads: Vec::with_capacity(nodes.len()),
            work_units: Vec::with_capacity(nodes.len()),
            imbalance: Vec::with_capacity(nodes.len()),
            group_names: Vec::new(),
            group_time: Vec::new(),
        };

        snapshot.collect(nodes, TimerId::ROOT, 0, accumulation, now);

        let group_names = nodes
            .iter()
            .flat_map(TimerNode::groups)
            .map(String::as_str)
            .collect::<BTreeSet<_>>();

        for name in group_names {
            snapshot
                .group_time
                .push(group_time(nodes, name, TimerId::ROOT, accumulation, now));
            snapshot.group_names.push(name.to_string());
        }

        snapshot
    }

    fn collect(
        &mut self,
        nodes: &[TimerNode],
        id: TimerId,
        parent_index: usize,
        accumulation: Accumulation,
        now: f64,
    ) {
        let Some(node) = nodes.get(id.index()) else {
            return;
        };

        let index = self.entries.len();
        let time = node.average_time(accumulation, now);
        let count = node.average_count(accumulation);
        let threads = i64::try_from(node.threads_active(accumulation)).unwrap_or(i64::MAX);

        self.entries.push(Entry {
            id: Some(node.id()),
            label: node.label().to_string(),
            level: node.level(),
            groups: node.groups().to_vec(),
            work_unit_label: node.work_unit_label().to_string(),
            parent_index,
        });
        self.time.push(time);
        self.count.push(count);
        self.threads.push(threads);
        self.work_units
            .push(node.average_work_units(accumulation).unwrap_or(UNDEFINED));
        self.imbalance.push(node.time_imbalance(accumulation, now));

        let mut child_time = 0.0;

        for child in node.children() {
            child_time += nodes
                .get(child.index())
                .map_or(0.0, |child| child.average_time(accumulation, now));

            self.collect(nodes, *child, index, accumulation, now);
        }

        if !node.children().is_empty() {
            self.entries.push(Entry {
                id: None,
                label: OTHER_LABEL.to_string(),
                level: node.level().saturating_add(1),
                groups: Vec::new(),
                work_unit_label: String::new(),
                parent_index: index,
            });
            self.time.push(time - child_time);
            self.count.push(count);
            self.threads.push(threads);
            self.work_units.push(UNDEFINED);
            self.imbalance.push(UNDEFINED);
        }
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[cfg(test)]
    pub(crate) fn time(&self) -> &[f64] {
        &self.time
    }
}

/// Time of a group below `id`: a timer in the group contributes its whole time and its
/// descendants are not visited again.
fn group_time(
    nodes: &[TimerNode],
    group: &str,
    id: TimerId,
    accumulation: Accumulation,
    now: f64,
) -> f64 {
    let Some(node) = nodes.get(id.index()) else {
        return 0.0;
    };

    if node.groups().iter().any(|name| name == group) {
        return node.average_time(accumulation, now);
    }

    node.children()
        .iter()
        .map(|child| group_time(nodes, group, *child, accumulation, now))
        .sum()
}

/// Thread imbalance of one timer, reduced over workers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ImbalanceStatistics {
    pub(crate) sum: f64,
    pub(crate) max: f64,
    pub(crate) min: f64,
}

/// Aggregated values of one position in the flattened timer tree.
#[derive(Clone, Debug)]
pub(crate) struct TimerStatistics {
    pub(crate) entry: Entry,
    pub(crate) time_sum: f64,
    pub(crate) time_max: RankedValue,
    pub(crate) time_min: RankedValue,
    pub(crate) count_sum: f64,
    pub(crate) threads_sum: i64,
    pub(crate) work_units_sum: f64,
    pub(crate) has_work_units: bool,

    /// `None` for the "Other" entry.
    pub(crate) imbalance: Option<ImbalanceStatistics>,

    pub(crate) total_fraction: f64,
    pub(crate) parent_fraction: f64,
}

/// Aggregated values of one user-defined group.
#[derive(Clone, Debug)]
pub(crate) struct GroupStatistics {
    pub(crate) name: String,
    pub(crate) time_sum: f64,
    pub(crate) time_max: RankedValue,
    pub(crate) time_min: RankedValue,
    pub(crate) total_fraction: f64,
}

/// Everything the aggregation root knows after reducing the snapshots of a subgroup.
#[derive(Clone, Debug)]
pub(crate) struct Statistics {
    pub(crate) workers: usize,

    /// In the order of the snapshot, starting with the root timer.
    pub(crate) timers: Vec<TimerStatistics>,

    /// Sorted by name.
    pub(crate) groups: Vec<GroupStatistics>,
}

/// Reduces the snapshots of all members of `comm` onto [`AGGREGATION_ROOT`].
///
/// All members must pass snapshots of structurally identical trees. Extremes are attributed to
/// `report_rank`, which is the rank of the caller in the group the report is about, not in
/// `comm`. Returns `None` on every member except the aggregation root.
pub(crate) fn reduce<C: Communicator>(
    snapshot: Snapshot,
    comm: &C,
    report_rank: usize,
    rule: WorkUnitRule,
) -> Result<Option<Statistics>> {
    let root = AGGREGATION_ROOT;

    let ranked = |values: &[f64]| {
        values
            .iter()
            .map(|value| RankedValue::new(*value, report_rank))
            .collect::<Vec<_>>()
    };

    let time_ranked = ranked(&snapshot.time);
    let time_sum = comm.reduce_f64(&snapshot.time, ReduceOp::Sum, root)?;
    let time_max = comm.reduce_ranked(&time_ranked, RankedOp::MaxLoc, root)?;
    let time_min = comm.reduce_ranked(&time_ranked, RankedOp::MinLoc, root)?;
    let work_units_sum = comm.reduce_f64(&snapshot.work_units, ReduceOp::Sum, root)?;
    let work_units_min = comm.reduce_f64(&snapshot.work_units, ReduceOp::Min, root)?;
    let count_sum = comm.reduce_f64(&snapshot.count, ReduceOp::Sum, root)?;
    let threads_sum = comm.reduce_i64(&snapshot.threads, ReduceOp::Sum, root)?;
    let imbalance_sum = comm.reduce_f64(&snapshot.imbalance, ReduceOp::Sum, root)?;
    let imbalance_max = comm.reduce_f64(&snapshot.imbalance, ReduceOp::Max, root)?;
    let imbalance_min = comm.reduce_f64(&snapshot.imbalance, ReduceOp::Min, root)?;

    let group_ranked = ranked(&snapshot.group_time);
    let group_sum = comm.reduce_f64(&snapshot.group_time, ReduceOp::Sum, root)?;
    let group_max = comm.reduce_ranked(&group_ranked, RankedOp::MaxLoc, root)?;
    let group_min = comm.reduce_ranked(&group_ranked, RankedOp::MinLoc, root)?;

    let (
        Some(time_sum),
        Some(time_max),
        Some(time_min),
        Some(work_units_sum),
        Some(work_units_min),
        Some(count_sum),
        Some(threads_sum),
        Some(imbalance_sum),
        Some(imbalance_max),
        Some(imbalance_min),
        Some(group_sum),
        Some(group_max),
        Some(group_min),
    ) = (
        time_sum,
        time_max,
        time_min,
        work_units_sum,
        work_units_min,
        count_sum,
        threads_sum,
        imbalance_sum,
        imbalance_max,
        imbalance_min,
        group_sum,
        group_max,
        group_min,
    )
    else {
        return Ok(None);
    };

    let total_time = time_sum.first().copied().unwrap_or(0.0);

    let timers = snapshot
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let at = |values: &[f64]| values.get(index).copied().unwrap_or(0.0);

            let time = at(&time_sum);
            let parent_time = time_sum.get(entry.parent_index).copied().unwrap_or(0.0);
            let work_units = at(&work_units_sum);

            let imbalance = (!entry.is_other()).then(|| ImbalanceStatistics {
                sum: at(&imbalance_sum),
                max: at(&imbalance_max),
                min: at(&imbalance_min),
            });

            TimerStatistics {
                entry,
                time_sum: time,
                time_max: ranked_at(&time_max, index),
                time_min: ranked_at(&time_min, index),
                count_sum: at(&count_sum),
                threads_sum: threads_sum.get(index).copied().unwrap_or(0),
                work_units_sum: work_units,
                has_work_units: rule.has_work_units(work_units, at(&work_units_min)),
                imbalance,
                total_fraction: fraction(time, total_time),
                parent_fraction: fraction(time, parent_time),
            }
        })
        .collect();

    let total_group_time = snapshot
        .group_names
        .iter()
        .position(|name| name == TOTAL_GROUP)
        .and_then(|index| group_sum.get(index).copied())
        .unwrap_or(0.0);

    let groups = snapshot
        .group_names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let time = group_sum.get(index).copied().unwrap_or(0.0);

            GroupStatistics {
                name,
                time_sum: time,
                time_max: ranked_at(&group_max, index),
                time_min: ranked_at(&group_min, index),
                total_fraction: fraction(time, total_group_time),
            }
        })
        .collect();

    Ok(Some(Statistics {
        workers: comm.size(),
        timers,
        groups,
    }))
}

fn ranked_at(values: &[RankedValue], index: usize) -> RankedValue {
    values
        .get(index)
        .copied()
        .unwrap_or(RankedValue::new(0.0, AGGREGATION_ROOT))
}

fn fraction(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::indexing_slicing, reason = "panics are acceptable in tests")]
mod tests {
    #![allow(clippy::float_cmp, reason = "fake clock values are exact")]

    use std::num::NonZero;
    use std::sync::Arc;

    use super::*;
    use crate::pal::{ClockFacade, FakeClock};
    use crate::tree::TimerTree;
    use crate::{LocalGroup, SingleThreaded, TimerOptions};

    fn tree() -> (TimerTree, FakeClock) {
        let clock = FakeClock::new();
        let tree = TimerTree::new(
            Arc::new(SingleThreaded),
            ClockFacade::fake(clock.clone()),
            true,
        );
        (tree, clock)
    }

    #[test]
    fn snapshot_appends_other_after_children() {
        let (tree, clock) = tree();

        tree.start_label("a").unwrap();
        clock.advance(1.0);
        tree.start_label("b").unwrap();
        clock.advance(2.0);
        tree.stop_label("b", None, None).unwrap();
        tree.stop_label("a", None, None).unwrap();

        let snapshot = Snapshot::capture(&tree.read_nodes(), Accumulation::Cumulative, 3.0);

        let labels = snapshot
            .entries()
            .iter()
            .map(|entry| entry.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["total", "a", "b", "Other", "Other"]);

        // The "Other" of "a" follows its only child and holds the self-time of "a".
        let other_of_a = &snapshot.entries()[3];
        assert!(other_of_a.is_other());
        assert_eq!(other_of_a.parent_index, 1);
        assert_eq!(other_of_a.level, 2);
        assert_eq!(snapshot.time()[3], 1.0);

        // The root is still open, so its time is extended up to the capture time.
        assert_eq!(snapshot.time()[0], 3.0);
        assert_eq!(snapshot.time()[4], 0.0);
    }

    #[test]
    fn group_time_does_not_double_count_nested_members() {
        let (tree, clock) = tree();

        let outer = tree
            .initialize_or_get_child("outer", &TimerOptions::new().group("IO"))
            .unwrap();
        tree.start_id(outer).unwrap();
        let inner = tree
            .initialize_or_get_child("inner", &TimerOptions::new().group("IO"))
            .unwrap();
        tree.start_id(inner).unwrap();
        clock.advance(4.0);
        tree.stop_id(inner, None, None).unwrap();
        tree.stop_id(outer, None, None).unwrap();

        let nodes = tree.read_nodes();
        assert_eq!(
            group_time(&nodes, "IO", TimerId::ROOT, Accumulation::Cumulative, 4.0),
            4.0
        );
    }

    #[test]
    fn single_worker_reduction() {
        let (tree, clock) = tree();

        tree.start_label("a").unwrap();
        clock.advance(2.0);
        tree.stop_label("a", Some(10.0), Some("cells")).unwrap();
        clock.advance(2.0);

        let snapshot = Snapshot::capture(&tree.read_nodes(), Accumulation::Cumulative, 4.0);

        let comm = LocalGroup::new(NonZero::new(1).unwrap())
            .into_communicators()
            .pop()
            .unwrap();

        let statistics = reduce(snapshot, &comm, 7, WorkUnitRule::PositiveSum)
            .unwrap()
            .unwrap();

        assert_eq!(statistics.workers, 1);

        let a = &statistics.timers[1];
        assert_eq!(a.time_sum, 2.0);
        assert_eq!(a.time_max.rank(), 7);
        assert_eq!(a.total_fraction, 0.5);
        assert_eq!(a.parent_fraction, 0.5);
        assert!(a.has_work_units);
        assert_eq!(a.work_units_sum, 10.0);
        assert_eq!(a.entry.work_unit_label, "cells");

        let other = &statistics.timers[2];
        assert!(other.imbalance.is_none());
        assert!(!other.has_work_units);
        assert_eq!(other.time_sum, 2.0);

        assert_eq!(statistics.groups.len(), 1);
        assert_eq!(statistics.groups[0].name, "Total");
        assert_eq!(statistics.groups[0].total_fraction, 1.0);
    }

    #[test]
    fn all_workers_rule_requires_defined_units() {
        assert!(WorkUnitRule::PositiveSum.has_work_units(5.0, -1.0));
        assert!(!WorkUnitRule::AllWorkers.has_work_units(5.0, -1.0));
        assert!(WorkUnitRule::AllWorkers.has_work_units(5.0, 0.0));
        assert!(!WorkUnitRule::AllWorkers.has_work_units(0.0, 0.0));
    }
}
