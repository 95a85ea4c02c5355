use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use tracing::{error, trace};

use crate::node::{Accumulation, TimerNode};
use crate::pal::{Clock, ClockFacade};
use crate::{ERR_POISONED_LOCK, Error, Fingerprint, Result, ThreadTeam, TimerId, TimerOptions};

const ROOT_LABEL: &str = "total";
const ROOT_GROUP: &str = "Total";

/// The timers of one worker, plus the current position of every thread in the hierarchy.
///
/// Nodes live in an append-only arena indexed by [`TimerId`]. Creating a node takes the arena
/// write lock; everything else only needs the read lock plus the per-thread slot of the node.
#[derive(Debug)]
pub(crate) struct TimerTree {
    nodes: RwLock<Vec<TimerNode>>,

    // The innermost open timer of each thread of the team.
    cursors: Box<[AtomicUsize]>,

    team: Arc<dyn ThreadTeam>,
    clock: ClockFacade,

    // Whether nesting violations are detected.
    validate: bool,
}

impl TimerTree {
    /// Creates a tree holding only the root timer, which is started on every thread.
    pub(crate) fn new(team: Arc<dyn ThreadTeam>, clock: ClockFacade, validate: bool) -> Self {
        let threads = team.max_threads().get();

        let root = TimerNode::new(
            TimerId::ROOT,
            None,
            ROOT_LABEL,
            &[ROOT_GROUP.to_string()],
            "",
            threads,
        );

        let now = clock.now();
        for thread in 0..threads {
            root.start(thread, now);
        }

        Self {
            nodes: RwLock::new(vec![root]),
            cursors: (0..threads)
                .map(|_| AtomicUsize::new(TimerId::ROOT.index()))
                .collect(),
            team,
            clock,
            validate,
        }
    }

    pub(crate) fn threads(&self) -> usize {
        self.cursors.len()
    }

    pub(crate) fn now(&self) -> f64 {
        self.clock.now()
    }

    pub(crate) fn resolution(&self) -> f64 {
        self.clock.resolution()
    }

    /// Returns the child of the calling thread's current timer with the given label,
    /// creating it first if it does not exist yet.
    ///
    /// Threads racing to create the same child all receive the id of the single node created.
    pub(crate) fn initialize_or_get_child(
        &self,
        label: &str,
        options: &TimerOptions,
    ) -> Result<TimerId> {
        let thread = self.thread_index()?;
        let current = self.cursor(thread);

        let existing = Self::find_child(&self.read_nodes(), current, label);

        if let Some(id) = existing {
            return Ok(id);
        }

        let mut nodes = self.nodes.write().expect(ERR_POISONED_LOCK);

        // Another thread may have created it while we were waiting for the write lock.
        if let Some(id) = Self::find_child(&nodes, current, label) {
            return Ok(id);
        }

        let id = TimerId::new(nodes.len());

        let parent = nodes
            .get_mut(current.index())
            .ok_or(Error::UnknownTimer { id: current })?;
        parent.add_child(id);
        let parent_level = parent.level();

        nodes.push(TimerNode::new(
            id,
            Some((current, parent_level)),
            label,
            options.groups(),
            options.work_unit_label_str(),
            self.threads(),
        ));

        trace!(%id, label, parent = %current, "created timer");

        Ok(id)
    }

    /// Resolves the child with the given label (creating it if needed) and starts it.
    pub(crate) fn start_label(&self, label: &str) -> Result<TimerId> {
        let id = self.initialize_or_get_child(label, &TimerOptions::default())?;
        let thread = self.thread_index()?;

        self.start_unchecked(thread, id)?;
        Ok(id)
    }

    /// Starts a timer that must be a child of the calling thread's current timer.
    pub(crate) fn start_id(&self, id: TimerId) -> Result<()> {
        let thread = self.thread_index()?;

        if self.validate {
            let nodes = self.read_nodes();
            let node = Self::node(&nodes, id)?;
            let current = self.cursor(thread);

            if node.parent() != Some(current) {
                return Err(report(Error::NotAChild {
                    id,
                    label: node.label().to_string(),
                    current,
                    current_label: Self::node(&nodes, current)?.label().to_string(),
                    thread,
                }));
            }
        }

        self.start_unchecked(thread, id)
    }

    fn start_unchecked(&self, thread: usize, id: TimerId) -> Result<()> {
        let now = self.now();
        let nodes = self.read_nodes();

        let started = Self::node(&nodes, id)?.start(thread, now);
        self.set_cursor(thread, started);

        Ok(())
    }

    /// Stops the calling thread's current timer, which must carry the given label.
    pub(crate) fn stop_label(
        &self,
        label: &str,
        work_units: Option<f64>,
        work_unit_label: Option<&str>,
    ) -> Result<()> {
        let now = self.now();
        let thread = self.thread_index()?;
        let nodes = self.read_nodes();
        let current = self.cursor(thread);

        if current == TimerId::ROOT {
            return Err(report(Error::NothingToStop { thread }));
        }

        let node = Self::node(&nodes, current)?;

        if self.validate && node.label() != label {
            return Err(report(Error::StopLabelMismatch {
                label: label.to_string(),
                current,
                current_label: node.label().to_string(),
                level: node.level(),
                thread,
            }));
        }

        let parent = node
            .stop(thread, now, work_units, work_unit_label)
            .unwrap_or(TimerId::ROOT);
        self.set_cursor(thread, parent);

        Ok(())
    }

    /// Stops the given timer, which must be the calling thread's current timer.
    pub(crate) fn stop_id(
        &self,
        id: TimerId,
        work_units: Option<f64>,
        work_unit_label: Option<&str>,
    ) -> Result<()> {
        let now = self.now();
        let thread = self.thread_index()?;
        let nodes = self.read_nodes();
        let node = Self::node(&nodes, id)?;

        if id == TimerId::ROOT {
            return Err(report(Error::NothingToStop { thread }));
        }

        let current = self.cursor(thread);

        if self.validate && id != current {
            let level = Self::node(&nodes, current)?.level();

            return Err(report(Error::StopMismatch {
                id,
                current,
                level,
                thread,
            }));
        }

        let parent = node
            .stop(thread, now, work_units, work_unit_label)
            .unwrap_or(TimerId::ROOT);
        self.set_cursor(thread, parent);

        Ok(())
    }

    /// The child of the calling thread's current timer with the given label, if any.
    pub(crate) fn child_id(&self, label: &str) -> Result<Option<TimerId>> {
        let thread = self.thread_index()?;
        let current = self.cursor(thread);

        Ok(Self::find_child(&self.read_nodes(), current, label))
    }

    pub(crate) fn current_id(&self) -> Result<TimerId> {
        Ok(self.cursor(self.thread_index()?))
    }

    /// The labels from the root down to the given timer as `/a/b/c`, excluding the root.
    pub(crate) fn full_label(&self, id: TimerId) -> Result<String> {
        let nodes = self.read_nodes();

        let mut labels = Vec::new();
        let mut next = Some(id);

        while let Some(id) = next.filter(|id| *id != TimerId::ROOT) {
            let node = Self::node(&nodes, id)?;
            labels.push(node.label());
            next = node.parent();
        }

        Ok(labels.iter().rev().fold(String::new(), |mut full, label| {
            full.push('/');
            full.push_str(label);
            full
        }))
    }

    pub(crate) fn node_count(&self) -> usize {
        self.read_nodes().len()
    }

    pub(crate) fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_tree(&self.read_nodes())
    }

    /// Grants read access to all nodes, e.g. to capture statistics.
    pub(crate) fn read_nodes(&self) -> RwLockReadGuard<'_, Vec<TimerNode>> {
        self.nodes.read().expect(ERR_POISONED_LOCK)
    }

    /// Clears one set of accumulators of every timer, rebasing open intervals to `now`.
    pub(crate) fn reset(&self, accumulation: Accumulation, now: f64) {
        for node in self.read_nodes().iter() {
            node.reset(accumulation, now);
        }
    }

    /// Moves the start of every open interval of one set of accumulators forward.
    pub(crate) fn shift_start_time(&self, accumulation: Accumulation, delta: f64) {
        for node in self.read_nodes().iter() {
            node.shift_start_time(accumulation, delta);
        }
    }

    fn thread_index(&self) -> Result<usize> {
        let thread = self.team.current_thread_index();

        if thread < self.threads() {
            Ok(thread)
        } else {
            Err(report(Error::ThreadOutOfRange {
                thread,
                threads: self.threads(),
            }))
        }
    }

    fn cursor(&self, thread: usize) -> TimerId {
        self.cursors
            .get(thread)
            .map_or(TimerId::ROOT, |cursor| {
                TimerId::new(cursor.load(Ordering::Relaxed))
            })
    }

    fn set_cursor(&self, thread: usize, id: TimerId) {
        if self.team.in_parallel_region() {
            if let Some(cursor) = self.cursors.get(thread) {
                cursor.store(id.index(), Ordering::Relaxed);
            }
        } else {
            for cursor in &self.cursors {
                cursor.store(id.index(), Ordering::Relaxed);
            }
        }
    }

    fn find_child(nodes: &[TimerNode], parent: TimerId, label: &str) -> Option<TimerId> {
        nodes
            .get(parent.index())?
            .children()
            .iter()
            .copied()
            .find(|child| nodes.get(child.index()).is_some_and(|node| node.label() == label))
    }

    fn node(nodes: &[TimerNode], id: TimerId) -> Result<&TimerNode> {
        nodes
            .get(id.index())
            .ok_or_else(|| report(Error::UnknownTimer { id }))
    }
}

fn report(error: Error) -> Error {
    error!(%error, "timer usage error");
    error
}
