use std::cmp::Ordering;

use crate::Result;

/// Element-wise reduction applied by collective operations of a [`Communicator`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReduceOp {
    /// Sum of the values of all workers.
    Sum,

    /// Smallest value of all workers.
    Min,

    /// Largest value of all workers.
    Max,
}

impl ReduceOp {
    /// Combines two floating point values.
    #[must_use]
    pub fn combine_f64(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sum => a + b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }

    /// Combines two integer values. Sums saturate instead of overflowing.
    #[must_use]
    pub fn combine_i64(self, a: i64, b: i64) -> i64 {
        match self {
            Self::Sum => a.saturating_add(b),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// Element-wise extremum that remembers which worker contributed the winning value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum RankedOp {
    /// Smallest value and the rank it came from.
    MinLoc,

    /// Largest value and the rank it came from.
    MaxLoc,
}

impl RankedOp {
    /// Combines two ranked values. On equal values the lower rank wins.
    #[must_use]
    pub fn combine(self, a: RankedValue, b: RankedValue) -> RankedValue {
        let preferred = match self {
            Self::MinLoc => a.value.total_cmp(&b.value),
            Self::MaxLoc => b.value.total_cmp(&a.value),
        };

        match preferred.then(a.rank.cmp(&b.rank)) {
            Ordering::Greater => b,
            Ordering::Less | Ordering::Equal => a,
        }
    }
}

/// A value together with the rank of the worker that contributed it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedValue {
    value: f64,
    rank: usize,
}

impl RankedValue {
    /// Creates a ranked value.
    #[must_use]
    pub const fn new(value: f64, rank: usize) -> Self {
        Self { value, rank }
    }

    /// The value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// The rank of the worker the value came from.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }
}

/// Collective communication between the workers of a group.
///
/// This is the message-passing capability the profiler needs to aggregate timers across
/// processes. Every operation is collective: all members of the group must call the same
/// operations in the same order, otherwise the group deadlocks. Implementations typically wrap
/// an MPI communicator; [`LocalCommunicator`][crate::LocalCommunicator] implements it for
/// workers that are threads of one process.
///
/// Reductions deliver their result to the `root` rank only and return `None` on all other
/// ranks. Dropping a communicator releases it.
pub trait Communicator: Sized + Send {
    /// The rank of the calling worker, in `0..size()`.
    fn rank(&self) -> usize;

    /// The number of workers in the group.
    fn size(&self) -> usize;

    /// Blocks until every worker in the group has called `barrier()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn barrier(&self) -> Result<()>;

    /// Partitions the group into subgroups of workers that passed the same `color`.
    ///
    /// Within a subgroup, ranks are ordered by `key`, with ties broken by the rank in this group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn split(&self, color: u64, key: i64) -> Result<Self>;

    /// Element-wise reduction of floating point values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn reduce_f64(&self, values: &[f64], op: ReduceOp, root: usize) -> Result<Option<Vec<f64>>>;

    /// Element-wise reduction of integer values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn reduce_i64(&self, values: &[i64], op: ReduceOp, root: usize) -> Result<Option<Vec<i64>>>;

    /// Element-wise extremum with source rank attribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn reduce_ranked(
        &self,
        values: &[RankedValue],
        op: RankedOp,
        root: usize,
    ) -> Result<Option<Vec<RankedValue>>>;

    /// Distributes the value of the `root` rank to every worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn broadcast_i64(&self, value: i64, root: usize) -> Result<i64>;

    /// Reduces one integer per worker and delivers the result to every worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Communication`][crate::Error::Communication] if the primitive fails.
    fn all_reduce_i64(&self, value: i64, op: ReduceOp) -> Result<i64>;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values")]

    use super::*;

    #[test]
    fn scalar_reductions() {
        assert_eq!(ReduceOp::Sum.combine_f64(1.5, 2.0), 3.5);
        assert_eq!(ReduceOp::Min.combine_f64(1.5, 2.0), 1.5);
        assert_eq!(ReduceOp::Max.combine_i64(-3, 2), 2);
        assert_eq!(ReduceOp::Sum.combine_i64(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn ranked_extremes_track_rank() {
        let low = RankedValue::new(1.0, 3);
        let high = RankedValue::new(4.0, 1);

        assert_eq!(RankedOp::MinLoc.combine(low, high), low);
        assert_eq!(RankedOp::MinLoc.combine(high, low), low);
        assert_eq!(RankedOp::MaxLoc.combine(low, high), high);
        assert_eq!(RankedOp::MaxLoc.combine(high, low), high);
    }

    #[test]
    fn ranked_ties_go_to_lowest_rank() {
        let first = RankedValue::new(2.0, 0);
        let second = RankedValue::new(2.0, 5);

        assert_eq!(RankedOp::MinLoc.combine(second, first).rank(), 0);
        assert_eq!(RankedOp::MaxLoc.combine(second, first).rank(), 0);
    }
}
