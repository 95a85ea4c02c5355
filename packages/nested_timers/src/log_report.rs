//! Append-only log of periodic report snapshots.
//!
//! Every snapshot is one line of separated columns. A file holds the snapshots of one timer tree
//! structure, so the column layout is only documented once, in a `#` comment block written when
//! the file is created.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, LogOptions, Rate, Report, Result, TimerRow};

const HEADER_WIDTH: usize = 80;

const COLUMNS_PER_GROUP: usize = 6;
const COLUMNS_PER_TIMER: usize = 9;

const TIMER_COLUMNS: [&str; COLUMNS_PER_TIMER] = [
    "Count average",
    "Time average",
    "percent of parent time",
    "max value",
    "max rank",
    "min value",
    "min rank",
    "Workunits (/s) average total",
    "average per process",
];

const GROUP_COLUMNS: [&str; COLUMNS_PER_GROUP] = [
    "Time average",
    "percent of total time",
    "max value",
    "max rank",
    "min value",
    "min rank",
];

/// Path of the log file for reports of the given fingerprint.
pub(crate) fn log_path(report: &Report, options: &LogOptions) -> PathBuf {
    PathBuf::from(format!("{}_{}.txt", options.prefix(), report.fingerprint()))
}

/// Appends one snapshot line to the log file, writing the header first if the file is new.
pub(crate) fn append(report: &Report, options: &LogOptions) -> Result<PathBuf> {
    let path = log_path(report, options);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| io_error(&path, source))?;

    let is_new = file
        .metadata()
        .map_err(|source| io_error(&path, source))?
        .len()
        == 0;

    let mut text = String::new();

    if is_new {
        text.push_str(&header(report, options));
    }

    text.push_str(&line(report, options));
    text.push('\n');

    write_all(file, &path, &text)?;

    debug!(path = %path.display(), is_new, "appended profile log snapshot");

    Ok(path)
}

fn write_all(file: File, path: &Path, text: &str) -> Result<()> {
    let mut writer = BufWriter::new(file);

    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn included(timer: &TimerRow, options: &LogOptions) -> bool {
    options.level_limit() == 0 || timer.level() <= options.level_limit()
}

fn titled_rule(title: &str) -> String {
    let title = format!(" {title} ");
    let dashes = HEADER_WIDTH.saturating_sub(title.len());
    let right = dashes.div_ceil(2);

    format!(
        "#{}{}{}\n",
        "-".repeat(dashes.saturating_sub(right)),
        title,
        "-".repeat(right)
    )
}

fn header(report: &Report, options: &LogOptions) -> String {
    let mut header = String::new();

    let code_width = report
        .timers()
        .iter()
        .map(|timer| timer.group_codes().len())
        .max()
        .unwrap_or(0)
        .max(1);

    header.push('#');
    header.push_str(&"-".repeat(HEADER_WIDTH));
    header.push('\n');

    writeln!(header, "# Profile with {} number of processes", report.workers())
        .expect("writing to a String is infallible");
    header.push_str("# The first column of each timer and group is listed below.\n");

    writeln!(header, "# Each timer has {COLUMNS_PER_TIMER} columns:")
        .expect("writing to a String is infallible");
    for (offset, name) in TIMER_COLUMNS.iter().enumerate() {
        writeln!(header, "#       +{offset}  {name}").expect("writing to a String is infallible");
    }

    writeln!(header, "# Each group has {COLUMNS_PER_GROUP} columns:")
        .expect("writing to a String is infallible");
    for (offset, name) in GROUP_COLUMNS.iter().enumerate() {
        writeln!(header, "#       +{offset}  {name}").expect("writing to a String is infallible");
    }

    let mut column = 1_usize;

    header.push_str(&titled_rule("User data"));
    writeln!(header, "#{column:>6} {:code_width$} Simulation time", "")
        .expect("writing to a String is infallible");
    column = column.saturating_add(1);

    header.push_str(&titled_rule("Groups"));
    for group in report.groups() {
        writeln!(
            header,
            "#{column:>6} {:code_width$} {}",
            group.code(),
            group.name()
        )
        .expect("writing to a String is infallible");
        column = column.saturating_add(COLUMNS_PER_GROUP);
    }

    header.push_str(&titled_rule("Timers"));
    for timer in report.timers().iter().filter(|timer| included(timer, options)) {
        let indent = timer.level().saturating_sub(1).saturating_mul(2);

        writeln!(
            header,
            "#{column:>6} {:code_width$} {:indent$}{}",
            timer.group_codes(),
            "",
            timer.label()
        )
        .expect("writing to a String is infallible");
        column = column.saturating_add(COLUMNS_PER_TIMER);
    }

    header.push('#');
    header.push_str(&"-".repeat(HEADER_WIDTH));
    header.push('\n');

    header
}

fn rate(rate: Rate) -> String {
    match rate {
        Rate::Finite(value) => value.to_string(),
        Rate::Infinite => "inf".to_string(),
    }
}

fn line(report: &Report, options: &LogOptions) -> String {
    let mut columns = vec![options.user_time().to_string()];

    for group in report.groups() {
        columns.extend([
            group.time_average().to_string(),
            group.total_percent().to_string(),
            group.time_max().value().to_string(),
            group.time_max().rank().to_string(),
            group.time_min().value().to_string(),
            group.time_min().rank().to_string(),
        ]);
    }

    for timer in report.timers().iter().filter(|timer| included(timer, options)) {
        columns.extend([
            timer.calls_average().to_string(),
            timer.time_average().to_string(),
            timer.parent_percent().to_string(),
            timer.time_max().value().to_string(),
            timer.time_max().rank().to_string(),
            timer.time_min().value().to_string(),
            timer.time_min().rank().to_string(),
        ]);

        match timer.throughput() {
            Some(throughput) => {
                columns.push(rate(throughput.total()));
                columns.push(rate(throughput.per_worker()));
            }
            None => columns.extend(["nan".to_string(), "nan".to_string()]),
        }
    }

    columns.join(options.separator_str())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::indexing_slicing, reason = "panics are acceptable in tests")]
mod tests {
    use std::fs;
    use std::num::NonZero;

    use super::*;
    use crate::{LocalGroup, Profiler, TimerOptions};

    fn report() -> Report {
        let comm = LocalGroup::new(NonZero::new(1).unwrap())
            .into_communicators()
            .pop()
            .unwrap();

        let profiler = Profiler::new();

        let id = profiler
            .initialize_timer("io", &TimerOptions::new().group("IO"))
            .unwrap();
        profiler.start_id(id).unwrap();
        profiler.start("inner").unwrap();
        profiler.stop_with_units("inner", 3.0, "bytes").unwrap();
        profiler.stop_id(id).unwrap();

        profiler.report(&comm, f64::NEG_INFINITY).unwrap().unwrap()
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("log");
        let options = LogOptions::new().file_prefix(prefix.to_string_lossy());

        let report = report();

        let path = append(&report, &options).unwrap();
        append(&report, &options.simulation_time(2.5)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let data = contents
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect::<Vec<_>>();

        assert_eq!(data.len(), 2);
        assert!(data[0].starts_with("0 "));
        assert!(data[1].starts_with("2.5 "));
        assert_eq!(contents.matches("Simulation time").count(), 1);
        assert!(
            path.to_string_lossy()
                .ends_with(&format!("log_{}.txt", report.fingerprint()))
        );
    }

    #[test]
    fn line_has_documented_column_count() {
        let report = report();
        let options = LogOptions::new().separator(";");

        let columns = line(&report, &options).split(';').count();

        assert_eq!(
            columns,
            1 + COLUMNS_PER_GROUP * report.groups().len()
                + COLUMNS_PER_TIMER * report.timers().len()
        );
    }

    #[test]
    fn undefined_units_are_nan() {
        let report = report();
        let text = line(&report, &LogOptions::new());

        // "io" has no work units, "inner" has.
        assert!(text.contains("nan nan"));
        assert!(report.timers().iter().any(|timer| timer.throughput().is_some()));
    }

    #[test]
    fn max_level_limits_timers() {
        let report = report();
        let options = LogOptions::new().max_level(1).separator(";");

        let top_level = report
            .timers()
            .iter()
            .filter(|timer| timer.level() == 1)
            .count();

        let columns = line(&report, &options).split(';').count();

        assert_eq!(
            columns,
            1 + COLUMNS_PER_GROUP * report.groups().len() + COLUMNS_PER_TIMER * top_level
        );
        assert!(!header(&report, &options).contains("inner"));
    }
}
