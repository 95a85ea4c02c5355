#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Hierarchical wall-clock timers for programs made of many workers, each running a team of
//! threads, aggregated across all workers into one human-readable report.
//!
//! Timers form a tree. Starting a timer by label opens the child of the current timer with that
//! label, creating it on first use, so the same label under different parents yields different
//! timers. Every thread of the team has its own position in the tree.
//!
//! ```
//! use nested_timers::Profiler;
//!
//! let profiler = Profiler::new();
//!
//! profiler.start("simulation").unwrap();
//!
//! for _ in 0..10 {
//!     profiler.start("propagate").unwrap();
//!     // Advance the simulation by one step.
//!     profiler.stop_with_units("propagate", 4096.0, "cells").unwrap();
//!
//!     profiler.start("io").unwrap();
//!     // Write diagnostics.
//!     profiler.stop("io").unwrap();
//! }
//!
//! profiler.stop("simulation").unwrap();
//! ```
//!
//! # Timer options
//!
//! Timers can be created explicitly to assign them to user-defined groups (e.g. `"IO"` or
//! `"MPI"`) and to name the unit of work they report. Starting and stopping by [`TimerId`]
//! skips the label lookup:
//!
//! ```
//! use nested_timers::{Profiler, TimerOptions};
//!
//! let profiler = Profiler::new();
//!
//! let checkpoint = profiler
//!     .initialize_timer("checkpoint", &TimerOptions::new().group("IO").work_unit_label("bytes"))
//!     .unwrap();
//!
//! profiler.start_id(checkpoint).unwrap();
//! profiler.stop_id_with_units(checkpoint, 1_048_576.0).unwrap();
//! ```
//!
//! # Threads
//!
//! A profiler shared by a team of threads is built with a [`ThreadTeam`] that tells it how many
//! threads there are and which one is calling. Label-based calls outside a parallel region
//! move every thread of the team; calls inside a parallel region move only the calling thread.
//! [`ScopedTeam`] provides parallel regions on top of scoped threads.
//!
//! # Reports
//!
//! [`Profiler::report()`], [`Profiler::print()`] and [`Profiler::print_log()`] are collective
//! operations over a [`Communicator`]: all workers of the group must call them together. Workers
//! are partitioned by the [`Fingerprint`] of their timer tree and each partition is aggregated
//! into its own [`Report`], with averages, extremes with the rank of the worker, call counts,
//! work unit throughput and the time of every group.
//!
//! [`LocalGroup`] provides a [`Communicator`] for workers that are threads of one process:
//!
//! ```
//! use std::num::NonZero;
//!
//! use nested_timers::{LocalGroup, Profiler};
//!
//! let reports = LocalGroup::new(NonZero::new(4).unwrap()).run(|comm| {
//!     let profiler = Profiler::new();
//!
//!     profiler.start("solve").unwrap();
//!     profiler.stop("solve").unwrap();
//!
//!     profiler.report(&comm, 0.0).unwrap()
//! });
//!
//! let report = reports[0].as_ref().unwrap();
//! assert_eq!(report.workers(), 4);
//! println!("{report}");
//! ```
//!
//! The text layout of printed reports is selected with [`ProfilerBuilder::report_styles()`] or
//! the [`NESTED_TIMERS_REPORT_STYLES`][REPORT_STYLES_ENV] environment variable.
//!
//! # Errors and logging
//!
//! Unbalanced instrumentation (stopping a timer that is not open, starting a timer that is not a
//! child of the current one) is reported as an [`Error`] and leaves the timer position
//! unchanged. Errors are also logged via `tracing`; the crate does not install a subscriber.

mod aggregate;
mod assert;
mod builder;
mod comm;
mod error;
mod fingerprint;
mod local_comm;
mod log_report;
mod node;
mod options;
mod pal;
mod profiler;
mod report;
mod style;
mod table;
mod team;
mod timer;
mod tree;

pub use aggregate::WorkUnitRule;
pub use builder::ProfilerBuilder;
pub use comm::{Communicator, RankedOp, RankedValue, ReduceOp};
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use local_comm::{LocalCommunicator, LocalGroup};
pub use node::TimerId;
pub use options::{LogOptions, PrintOptions, TimerOptions};
pub use pal::{Clock, MonotonicClock};
pub use profiler::Profiler;
pub use report::{GroupRow, Imbalance, Rate, Report, Throughput, TimerRow};
pub use style::{REPORT_STYLES_ENV, ReportStyle, UnknownReportStyle};
pub use team::{ScopedTeam, SingleThreaded, ThreadTeam};
pub use timer::Timer;

pub(crate) const ERR_POISONED_LOCK: &str =
    "encountered poisoned lock - program validity cannot be guaranteed";
