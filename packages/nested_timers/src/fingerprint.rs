use std::fmt::{self, Display};
use std::hash::{BuildHasher, Hasher};
use std::num::NonZero;

use foldhash::quality::FixedState;

use crate::TimerId;
use crate::node::TimerNode;

// Fixed so that every worker (and every run) derives the same value for the same structure.
const SEED: u64 = 0x6e65_7374_6564_5f74;

/// Structural signature of the timer tree of one worker.
///
/// Workers whose trees have the same labels, groups and work unit labels at every position
/// produce the same fingerprint, regardless of the measured times. Workers with equal
/// fingerprints are aggregated into the same report.
///
/// A fingerprint is never zero.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Fingerprint(NonZero<u64>);

impl Fingerprint {
    /// The numeric value of the fingerprint.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Hashes every node in depth-first pre-order, children in creation order.
    pub(crate) fn of_tree(nodes: &[TimerNode]) -> Self {
        let mut hasher = FixedState::with_seed(SEED).build_hasher();

        let mut pending = vec![TimerId::ROOT];

        while let Some(id) = pending.pop() {
            let Some(node) = nodes.get(id.index()) else {
                continue;
            };

            hasher.write(node.hashable_string().as_bytes());
            hasher.write_usize(node.children().len());

            // Reversed so that the first child is popped first.
            pending.extend(node.children().iter().rev().copied());
        }

        Self::from_hash(hasher.finish())
    }

    fn from_hash(hash: u64) -> Self {
        Self(NonZero::new(hash).unwrap_or(NonZero::<u64>::MIN))
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
