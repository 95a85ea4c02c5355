use std::path::PathBuf;

use thiserror::Error;

use crate::TimerId;

/// Errors reported by the profiler.
///
/// Usage errors (`NotAChild`, `StopMismatch`, `StopLabelMismatch`, `NothingToStop`) indicate
/// unbalanced instrumentation in the calling program. They are detected only when validation is
/// enabled on the [`Profiler`][crate::Profiler] and leave the timer position unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A timer was started that is not a direct child of the current timer position.
    #[error(
        "timer {id} ('{label}') is not a child of the current timer {current} ('{current_label}') on thread {thread}"
    )]
    NotAChild {
        /// The timer that the caller attempted to start.
        id: TimerId,
        /// Label of the timer that the caller attempted to start.
        label: String,
        /// The timer that is currently open on the calling thread.
        current: TimerId,
        /// Label of the timer that is currently open on the calling thread.
        current_label: String,
        /// Index of the calling thread in its team.
        thread: usize,
    },

    /// A timer was stopped by id but it is not the innermost open timer.
    #[error(
        "stopping timer {id} but the innermost open timer is {current} at level {level} on thread {thread}"
    )]
    StopMismatch {
        /// The timer that the caller attempted to stop.
        id: TimerId,
        /// The timer that is currently open on the calling thread.
        current: TimerId,
        /// Hierarchy level of the currently open timer.
        level: usize,
        /// Index of the calling thread in its team.
        thread: usize,
    },

    /// A timer was stopped by label but the label does not match the innermost open timer.
    #[error(
        "stopping '{label}' but the innermost open timer is {current} ('{current_label}') at level {level} on thread {thread}"
    )]
    StopLabelMismatch {
        /// The label that the caller attempted to stop.
        label: String,
        /// The timer that is currently open on the calling thread.
        current: TimerId,
        /// Label of the timer that is currently open on the calling thread.
        current_label: String,
        /// Hierarchy level of the currently open timer.
        level: usize,
        /// Index of the calling thread in its team.
        thread: usize,
    },

    /// A stop was requested while only the root timer is open.
    #[error("no timer is open on thread {thread}, the root timer cannot be stopped")]
    NothingToStop {
        /// Index of the calling thread in its team.
        thread: usize,
    },

    /// The timer id does not exist in this profiler.
    #[error("timer {id} does not exist")]
    UnknownTimer {
        /// The unknown timer id.
        id: TimerId,
    },

    /// The thread team reported a thread index outside the thread count fixed at construction.
    #[error("thread index {thread} is out of range for a team of {threads} threads")]
    ThreadOutOfRange {
        /// The reported thread index.
        thread: usize,
        /// The thread count fixed when the profiler was built.
        threads: usize,
    },

    /// Workers with equal fingerprints disagree on the number of timers.
    #[error(
        "workers with equal timer fingerprints have between {min_timers} and {max_timers} timers, fingerprint collision?"
    )]
    FingerprintCollision {
        /// Smallest timer count in the subgroup.
        min_timers: i64,
        /// Largest timer count in the subgroup.
        max_timers: i64,
    },

    /// A group communication primitive failed.
    #[error("group communication failed: {0}")]
    Communication(String),

    /// This worker succeeded but at least one other worker in the group failed.
    #[error("another worker in the group failed to produce its report")]
    PeerFailed,

    /// A report file could not be written.
    #[error("cannot write report file {path}: {source}")]
    Io {
        /// The report file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A specialized `Result` type for profiler operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
