use std::cell::Cell;
use std::collections::HashMap;
use std::num::NonZero;
use std::panic;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use crate::{Communicator, ERR_POISONED_LOCK, Error, RankedOp, RankedValue, ReduceOp, Result};

/// A group of workers that are threads of the current process.
///
/// Each worker receives one [`LocalCommunicator`] and must run on its own thread, because
/// collective operations block until every member has joined them. This allows multi-worker
/// aggregation to run without an external message-passing runtime, e.g. in tests or in
/// programs that use threads as workers.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use nested_timers::{Communicator, LocalGroup};
///
/// let ranks = LocalGroup::new(NonZero::new(3).unwrap()).run(|comm| {
///     comm.barrier().unwrap();
///     comm.rank()
/// });
///
/// assert_eq!(ranks, vec![0, 1, 2]);
/// ```
#[derive(Debug)]
pub struct LocalGroup {
    communicators: Vec<LocalCommunicator>,
}

impl LocalGroup {
    /// Creates a group of `size` workers.
    #[must_use]
    pub fn new(size: NonZero<usize>) -> Self {
        let shared = Arc::new(Shared::new(size.get()));

        Self {
            communicators: (0..size.get())
                .map(|rank| LocalCommunicator::new(Arc::clone(&shared), rank))
                .collect(),
        }
    }

    /// Returns the communicators of all workers, in rank order.
    #[must_use]
    pub fn into_communicators(self) -> Vec<LocalCommunicator> {
        self.communicators
    }

    /// Runs `body` once per worker, each on its own thread, and returns the results in rank order.
    ///
    /// # Panics
    ///
    /// Resumes the panic of a worker whose body panicked.
    pub fn run<F, R>(self, body: F) -> Vec<R>
    where
        F: Fn(LocalCommunicator) -> R + Sync,
        R: Send,
    {
        let body = &body;

        thread::scope(|scope| {
            let handles = self
                .communicators
                .into_iter()
                .map(|comm| scope.spawn(move || body(comm)))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect()
        })
    }
}

/// The [`Communicator`] of one worker of a [`LocalGroup`].
#[derive(Debug)]
pub struct LocalCommunicator {
    shared: Arc<Shared>,
    rank: usize,

    // Number of splits performed so far. All members split in the same order, so this
    // identifies a split operation across the group.
    splits: Cell<u64>,
}

impl LocalCommunicator {
    fn new(shared: Arc<Shared>, rank: usize) -> Self {
        Self {
            shared,
            rank,
            splits: Cell::new(0),
        }
    }

    /// Deposits our contribution and returns the contributions of all members in rank order.
    fn exchange(&self, payload: Payload) -> Vec<Payload> {
        {
            let mut slots = self.shared.slots.lock().expect(ERR_POISONED_LOCK);

            if let Some(slot) = slots.get_mut(self.rank) {
                *slot = Some(payload);
            }
        }

        self.shared.barrier.wait();

        let contributions = self
            .shared
            .slots
            .lock()
            .expect(ERR_POISONED_LOCK)
            .iter()
            .flatten()
            .cloned()
            .collect();

        // Nobody may deposit the next contribution before everyone has read this one.
        self.shared.barrier.wait();

        contributions
    }

    fn reduce_with<T, F>(
        &self,
        values: &[T],
        root: usize,
        wrap: fn(Vec<T>) -> Payload,
        unwrap: fn(Payload) -> Option<Vec<T>>,
        combine: F,
    ) -> Result<Option<Vec<T>>>
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        self.check_root(root)?;

        let contributions = self.exchange(wrap(values.to_vec()));

        if self.rank != root {
            return Ok(None);
        }

        let mut contributions = contributions.into_iter().map(unwrap);

        let mut result = contributions
            .next()
            .flatten()
            .ok_or_else(|| mismatch("reduce"))?;

        for contribution in contributions {
            let contribution = contribution.ok_or_else(|| mismatch("reduce"))?;

            if contribution.len() != result.len() {
                return Err(Error::Communication(format!(
                    "reduce called with {} and {} values by different workers",
                    result.len(),
                    contribution.len()
                )));
            }

            for (accumulated, value) in result.iter_mut().zip(contribution) {
                *accumulated = combine(*accumulated, value);
            }
        }

        Ok(Some(result))
    }

    fn check_root(&self, root: usize) -> Result<()> {
        if root < self.shared.size {
            Ok(())
        } else {
            Err(Error::Communication(format!(
                "root rank {root} is outside a group of {} workers",
                self.shared.size
            )))
        }
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> Result<()> {
        self.shared.barrier.wait();
        Ok(())
    }

    fn split(&self, color: u64, key: i64) -> Result<Self> {
        let sequence = self.splits.get();
        self.splits.set(sequence.wrapping_add(1));

        let contributions = self.exchange(Payload::Split { color, key });

        let mut members = Vec::new();

        for (rank, contribution) in contributions.into_iter().enumerate() {
            let Payload::Split {
                color: member_color,
                key: member_key,
            } = contribution
            else {
                return Err(mismatch("split"));
            };

            if member_color == color {
                members.push((member_key, rank));
            }
        }

        members.sort_unstable();

        let new_rank = members
            .iter()
            .position(|(_, rank)| *rank == self.rank)
            .ok_or_else(|| mismatch("split"))?;

        let child = {
            let mut children = self.shared.children.lock().expect(ERR_POISONED_LOCK);

            Arc::clone(
                children
                    .entry((sequence, color))
                    .or_insert_with(|| Arc::new(Shared::new(members.len()))),
            )
        };

        // Once every member holds its subgroup, the registry entries are no longer needed.
        self.shared.barrier.wait();

        if self.rank == 0 {
            self.shared
                .children
                .lock()
                .expect(ERR_POISONED_LOCK)
                .retain(|(entry_sequence, _), _| *entry_sequence != sequence);
        }

        Ok(Self::new(child, new_rank))
    }

    fn reduce_f64(&self, values: &[f64], op: ReduceOp, root: usize) -> Result<Option<Vec<f64>>> {
        self.reduce_with(values, root, Payload::F64, Payload::into_f64, |a, b| {
            op.combine_f64(a, b)
        })
    }

    fn reduce_i64(&self, values: &[i64], op: ReduceOp, root: usize) -> Result<Option<Vec<i64>>> {
        self.reduce_with(values, root, Payload::I64, Payload::into_i64, |a, b| {
            op.combine_i64(a, b)
        })
    }

    fn reduce_ranked(
        &self,
        values: &[RankedValue],
        op: RankedOp,
        root: usize,
    ) -> Result<Option<Vec<RankedValue>>> {
        self.reduce_with(values, root, Payload::Ranked, Payload::into_ranked, |a, b| {
            op.combine(a, b)
        })
    }

    fn broadcast_i64(&self, value: i64, root: usize) -> Result<i64> {
        self.check_root(root)?;

        self.exchange(Payload::I64(vec![value]))
            .into_iter()
            .nth(root)
            .and_then(Payload::into_i64)
            .and_then(|values| values.first().copied())
            .ok_or_else(|| mismatch("broadcast"))
    }

    fn all_reduce_i64(&self, value: i64, op: ReduceOp) -> Result<i64> {
        let mut accumulated = None;

        for contribution in self.exchange(Payload::I64(vec![value])) {
            let value = contribution
                .into_i64()
                .and_then(|values| values.first().copied())
                .ok_or_else(|| mismatch("all-reduce"))?;

            accumulated = Some(accumulated.map_or(value, |a| op.combine_i64(a, value)));
        }

        accumulated.ok_or_else(|| mismatch("all-reduce"))
    }
}

#[derive(Debug)]
struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Option<Payload>>>,

    // Subgroups being formed, keyed by split sequence number and color.
    children: Mutex<HashMap<(u64, u64), Arc<Shared>>>,
}

impl Shared {
    fn new(size: usize) -> Self {
        Self {
            size,
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![None; size]),
            children: Mutex::new(HashMap::new()),
        }
    }
}

#[derive(Clone, Debug)]
enum Payload {
    F64(Vec<f64>),
    I64(Vec<i64>),
    Ranked(Vec<RankedValue>),
    Split { color: u64, key: i64 },
}

impl Payload {
    fn into_f64(self) -> Option<Vec<f64>> {
        match self {
            Self::F64(values) => Some(values),
            _ => None,
        }
    }

    fn into_i64(self) -> Option<Vec<i64>> {
        match self {
            Self::I64(values) => Some(values),
            _ => None,
        }
    }

    fn into_ranked(self) -> Option<Vec<RankedValue>> {
        match self {
            Self::Ranked(values) => Some(values),
            _ => None,
        }
    }
}

fn mismatch(operation: &str) -> Error {
    Error::Communication(format!(
        "workers called different collective operations during {operation}"
    ))
}
