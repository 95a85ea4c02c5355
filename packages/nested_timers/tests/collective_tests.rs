//! Integration tests for aggregating timers across a group of workers.
//!
//! Workers are threads of this process, connected by a `LocalGroup`. Every worker has its own
//! manual clock so that the aggregated values are exact.

#![allow(
    clippy::float_cmp,
    clippy::indexing_slicing,
    reason = "test code indexes known rows and compares exact manual clock values"
)]

use std::fs;
use std::num::NonZero;
use std::path::Path;
use std::sync::{Arc, Mutex};

use nested_timers::{
    Clock, Communicator, LocalGroup, LogOptions, PrintOptions, Profiler, ReportStyle, TimerOptions,
    WorkUnitRule,
};

#[derive(Clone, Debug, Default)]
struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    fn advance(&self, seconds: f64) {
        *self.now.lock().unwrap() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }

    fn resolution(&self) -> f64 {
        1e-6
    }
}

fn workers(count: usize) -> LocalGroup {
    LocalGroup::new(NonZero::new(count).unwrap())
}

fn profiler(clock: &ManualClock) -> Profiler {
    Profiler::builder()
        .clock(clock.clone())
        .validate(true)
        .report_styles(vec![ReportStyle::Full, ReportStyle::Groups])
        .build()
}

#[expect(clippy::cast_precision_loss, reason = "small test ranks")]
fn seconds_for(rank: usize) -> f64 {
    (rank + 1) as f64
}

#[test]
fn identical_trees_form_one_report() {
    let reports = workers(4).run(|comm| {
        let clock = ManualClock::default();
        let profiler = profiler(&clock);

        profiler.start("step").unwrap();
        clock.advance(1.0);

        profiler.start("solve").unwrap();
        clock.advance(seconds_for(comm.rank()));
        profiler.stop("solve").unwrap();

        profiler.stop("step").unwrap();

        profiler.report(&comm, 0.0).unwrap()
    });

    assert!(reports[1..].iter().all(Option::is_none));

    let report = reports[0].as_ref().unwrap();
    assert_eq!(report.subgroup_index(), 0);
    assert_eq!(report.workers(), 4);

    let step = &report.timers()[0];
    assert_eq!(step.label(), "step");
    assert_eq!(step.time_average(), 3.5);
    assert_eq!(step.parent_percent(), 100.0);

    let solve = &report.timers()[1];
    assert_eq!(solve.label(), "solve");
    assert_eq!(solve.level(), 2);
    assert_eq!(solve.time_average(), 2.5);
    assert_eq!(solve.time_max().value(), 4.0);
    assert_eq!(solve.time_max().rank(), 3);
    assert_eq!(solve.time_min().value(), 1.0);
    assert_eq!(solve.time_min().rank(), 0);
    assert_eq!(solve.calls_average(), 1.0);

    // Time of "step" not spent in "solve", averaged over all workers.
    let other = &report.timers()[2];
    assert!(other.is_other());
    assert_eq!(other.level(), 2);
    assert_eq!(other.time_average(), step.time_average() - solve.time_average());
    assert_eq!(other.time_average(), 1.0);
    assert_eq!(other.time_max().value(), 1.0);
    assert_eq!(other.time_min().value(), 1.0);
}

#[test]
fn divergent_trees_form_separate_reports() {
    let reports = workers(4).run(|comm| {
        let clock = ManualClock::default();
        let profiler = profiler(&clock);

        let label = if comm.rank() == 3 { "b" } else { "a" };

        profiler.start(label).unwrap();
        clock.advance(1.0);
        profiler.stop(label).unwrap();

        profiler.report(&comm, 0.0).unwrap()
    });

    let produced = reports
        .iter()
        .enumerate()
        .filter_map(|(rank, report)| report.as_ref().map(|report| (rank, report)))
        .collect::<Vec<_>>();

    assert_eq!(produced.len(), 2);

    let (rank, largest) = produced[0];
    assert_eq!(rank, 0);
    assert_eq!(largest.subgroup_index(), 0);
    assert_eq!(largest.workers(), 3);
    assert_eq!(largest.timers()[0].label(), "a");

    let (rank, smaller) = produced[1];
    assert_eq!(rank, 3);
    assert_eq!(smaller.subgroup_index(), 1);
    assert_eq!(smaller.workers(), 1);
    assert_eq!(smaller.timers()[0].label(), "b");

    // Extremes are attributed to ranks in the full group.
    assert_eq!(smaller.timers()[0].time_max().rank(), 3);

    assert_ne!(largest.fingerprint(), smaller.fingerprint());
}

#[test]
fn equal_subgroups_are_ordered_by_leader_rank() {
    let indexes = workers(4).run(|comm| {
        let profiler = profiler(&ManualClock::default());

        // Ranks 0 and 2 share a tree, as do ranks 1 and 3.
        let label = if comm.rank() % 2 == 0 { "even" } else { "odd" };
        profiler.start(label).unwrap();
        profiler.stop(label).unwrap();

        profiler
            .report(&comm, 0.0)
            .unwrap()
            .map(|report| (report.subgroup_index(), report.timers()[0].label().to_string()))
    });

    assert_eq!(indexes[0], Some((0, "even".to_string())));
    assert_eq!(indexes[1], Some((1, "odd".to_string())));
    assert_eq!(indexes[2], None);
    assert_eq!(indexes[3], None);
}

#[test]
fn work_units_rule_applies_across_workers() {
    let run = |rule: WorkUnitRule| {
        workers(2).run(move |comm| {
            let clock = ManualClock::default();
            let profiler = Profiler::builder()
                .clock(clock.clone())
                .work_unit_rule(rule)
                .build();

            let id = profiler
                .initialize_timer("step", &TimerOptions::new().work_unit_label("cells"))
                .unwrap();

            profiler.start_id(id).unwrap();
            clock.advance(2.0);

            // Only the first worker reports work units.
            if comm.rank() == 0 {
                profiler.stop_id_with_units(id, 8.0).unwrap();
            } else {
                profiler.stop_id(id).unwrap();
            }

            profiler.report(&comm, 0.0).unwrap()
        })
    };

    let lenient = run(WorkUnitRule::PositiveSum);
    let strict = run(WorkUnitRule::AllWorkers);

    assert!(lenient[0].as_ref().unwrap().timers()[0].throughput().is_some());
    assert!(strict[0].as_ref().unwrap().timers()[0].throughput().is_none());
}

#[test]
fn group_time_is_aggregated_with_ranks() {
    let reports = workers(3).run(|comm| {
        let clock = ManualClock::default();
        let profiler = profiler(&clock);

        let io = profiler
            .initialize_timer("write", &TimerOptions::new().group("IO"))
            .unwrap();

        profiler.start_id(io).unwrap();
        clock.advance(seconds_for(comm.rank()));
        profiler.stop_id(io).unwrap();

        profiler.start("compute").unwrap();
        clock.advance(6.0 - seconds_for(comm.rank()));
        profiler.stop("compute").unwrap();

        profiler.report(&comm, 0.0).unwrap()
    });

    let report = reports[0].as_ref().unwrap();
    let io = report.group("IO").unwrap();

    assert_eq!(io.time_average(), 2.0);
    assert_eq!(io.time_max().rank(), 2);
    assert_eq!(io.time_min().rank(), 0);
    assert_eq!(report.group("Total").unwrap().time_average(), 6.0);
}

fn prefix_in(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

#[test]
fn print_writes_one_file_per_subgroup() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = prefix_in(dir.path(), "profile");

    workers(3).run(|comm| {
        let clock = ManualClock::default();
        let profiler = profiler(&clock);

        let label = if comm.rank() == 0 { "lonely" } else { "shared" };
        profiler.start(label).unwrap();
        clock.advance(1.0);
        profiler.stop(label).unwrap();

        profiler
            .print(&comm, &PrintOptions::new().file_prefix(prefix.clone()))
            .unwrap();
    });

    let largest = fs::read_to_string(dir.path().join("profile_0.txt")).unwrap();
    let smaller = fs::read_to_string(dir.path().join("profile_1.txt")).unwrap();

    assert!(largest.contains("shared"));
    assert!(largest.contains("Processes in set of timers 2"));
    assert!(smaller.contains("lonely"));
    assert!(smaller.contains("Processes in set of timers 1"));

    // Both configured styles are written, under one header.
    assert_eq!(largest.matches("Timer resolution is").count(), 1);
    assert!(largest.contains("Workunit-rate"));
    assert!(largest.contains("Id"));
}

#[test]
fn log_appends_interval_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = prefix_in(dir.path(), "log");

    let fingerprints = workers(2).run(|comm| {
        let clock = ManualClock::default();
        let profiler = profiler(&clock);

        for snapshot in 0..2_u8 {
            profiler.start("step").unwrap();
            clock.advance(1.0);
            profiler.stop("step").unwrap();

            let options = LogOptions::new()
                .file_prefix(prefix.clone())
                .separator(",")
                .simulation_time(f64::from(snapshot));

            profiler.print_log(&comm, &options).unwrap();
        }

        profiler.fingerprint()
    });

    let path = dir
        .path()
        .join(format!("log_{}.txt", fingerprints[0]));
    let contents = fs::read_to_string(path).unwrap();

    let lines = contents
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);

    for (snapshot, line) in lines.iter().enumerate() {
        let columns = line.split(',').collect::<Vec<_>>();

        // Simulation time, the "Total" group, then "step" starting with its call count.
        assert_eq!(columns[0], snapshot.to_string());
        assert_eq!(columns[7], "1");
        assert_eq!(columns[8], "1");
    }

    assert_eq!(contents.matches("Simulation time").count(), 1);
}
