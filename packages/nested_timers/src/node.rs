use std::fmt::{self, Display};
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::ERR_POISONED_LOCK;

/// Identifies one timer within a [`Profiler`][crate::Profiler].
///
/// Ids are assigned sequentially as timers are created and stay valid for the lifetime of the
/// profiler. Id 0 is always the root timer named `total`.
///
/// An id is only meaningful for the profiler that issued it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerId(usize);

impl TimerId {
    /// The root timer that measures the total time since the profiler was created.
    pub const ROOT: Self = Self(0);

    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of the timer in the creation order of its profiler.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Selects one of the two independent sets of accumulators kept by every timer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Accumulation {
    /// Accumulates from profiler creation onwards and is never reset.
    Cumulative,

    /// Accumulates since the previous log snapshot.
    Interval,
}

/// Totals of one thread on one timer.
#[derive(Clone, Copy, Debug)]
struct Accumulator {
    count: u64,
    time: f64,

    // `None` once any stop of this thread failed to provide work units.
    work_units: Option<f64>,

    start_time: f64,
}

impl Accumulator {
    const fn new() -> Self {
        Self {
            count: 0,
            time: 0.0,
            work_units: Some(0.0),
            start_time: 0.0,
        }
    }

    /// Applies one stop and returns whether the provided work units were accepted
    /// as the first work units of this accumulator.
    fn stop(&mut self, now: f64, work_units: Option<f64>) -> bool {
        let provided = work_units.filter(|units| *units >= 0.0);

        let first_units = if self.count == 0 {
            self.work_units = provided;
            provided.is_some()
        } else {
            self.work_units = match (self.work_units, provided) {
                (Some(total), Some(units)) => Some(total + units),
                _ => None,
            };
            false
        };

        self.time += now - self.start_time;
        self.count = self.count.saturating_add(1);

        first_units
    }

    fn reset(&mut self, now: f64, active: bool) {
        self.count = 0;
        self.time = 0.0;
        self.work_units = Some(0.0);

        if active {
            self.start_time = now;
        }
    }
}

#[derive(Debug)]
struct ThreadSlot {
    active: bool,
    cumulative: Accumulator,
    interval: Accumulator,
}

impl ThreadSlot {
    const fn new() -> Self {
        Self {
            active: false,
            cumulative: Accumulator::new(),
            interval: Accumulator::new(),
        }
    }

    fn accumulator(&self, accumulation: Accumulation) -> &Accumulator {
        match accumulation {
            Accumulation::Cumulative => &self.cumulative,
            Accumulation::Interval => &self.interval,
        }
    }

    fn accumulator_mut(&mut self, accumulation: Accumulation) -> &mut Accumulator {
        match accumulation {
            Accumulation::Cumulative => &mut self.cumulative,
            Accumulation::Interval => &mut self.interval,
        }
    }

    fn participates(&self, accumulation: Accumulation) -> bool {
        self.active || self.accumulator(accumulation).count > 0
    }

    /// Accumulated time, extended up to `now` if the timer is still open on this thread.
    fn live_time(&self, accumulation: Accumulation, now: f64) -> f64 {
        let accumulator = self.accumulator(accumulation);

        if self.active {
            accumulator.time + (now - accumulator.start_time)
        } else {
            accumulator.time
        }
    }
}

/// One named timer in the tree of a single worker.
///
/// The structural attributes are fixed at creation except for the child list, which only
/// grows, and the work unit label, which is latched once. Every thread of the team owns one
/// slot of accumulators and only ever mutates its own slot.
#[derive(Debug)]
pub(crate) struct TimerNode {
    id: TimerId,
    label: String,
    groups: Box<[String]>,
    parent: Option<TimerId>,
    level: usize,
    children: Vec<TimerId>,
    work_unit_label: OnceLock<String>,
    slots: Box<[Mutex<ThreadSlot>]>,
}

impl TimerNode {
    pub(crate) fn new(
        id: TimerId,
        parent: Option<(TimerId, usize)>,
        label: &str,
        groups: &[String],
        work_unit_label: &str,
        threads: usize,
    ) -> Self {
        let work_unit_label = if work_unit_label.is_empty() {
            OnceLock::new()
        } else {
            OnceLock::from(work_unit_label.to_string())
        };

        Self {
            id,
            label: label.to_string(),
            groups: groups.into(),
            parent: parent.map(|(parent_id, _)| parent_id),
            level: parent.map_or(0, |(_, parent_level)| parent_level.saturating_add(1)),
            children: Vec::new(),
            work_unit_label,
            slots: (0..threads).map(|_| Mutex::new(ThreadSlot::new())).collect(),
        }
    }

    pub(crate) fn id(&self) -> TimerId {
        self.id
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn groups(&self) -> &[String] {
        &self.groups
    }

    pub(crate) fn parent(&self) -> Option<TimerId> {
        self.parent
    }

    pub(crate) fn level(&self) -> usize {
        self.level
    }

    pub(crate) fn children(&self) -> &[TimerId] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, child: TimerId) {
        self.children.push(child);
    }

    pub(crate) fn work_unit_label(&self) -> &str {
        self.work_unit_label.get().map_or("", String::as_str)
    }

    /// Opens an interval on the given thread and returns the id of this timer.
    pub(crate) fn start(&self, thread: usize, now: f64) -> TimerId {
        let mut slot = self.slot(thread);

        slot.active = true;
        slot.cumulative.start_time = now;
        slot.interval.start_time = now;

        self.id
    }

    /// Closes the interval of the given thread and returns the id of the parent timer.
    ///
    /// Work units are accounted all-or-nothing: a stop without (non-negative) work units makes
    /// the work unit total undefined until the accumulator is reset. The work unit label is
    /// latched by the first stop that provides work units.
    pub(crate) fn stop(
        &self,
        thread: usize,
        now: f64,
        work_units: Option<f64>,
        work_unit_label: Option<&str>,
    ) -> Option<TimerId> {
        let first_units = {
            let mut slot = self.slot(thread);

            slot.active = false;
            let first_units = slot.cumulative.stop(now, work_units);
            slot.interval.stop(now, work_units);

            first_units
        };

        let latched = work_unit_label.filter(|label| first_units && !label.is_empty());

        if let Some(label) = latched {
            // Only the first label wins, later ones are ignored.
            _ = self.work_unit_label.set(label.to_string());
        }

        self.parent
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self, thread: usize) -> bool {
        self.slot(thread).active
    }

    /// Number of threads that have stopped this timer at least once or have it open right now.
    pub(crate) fn threads_active(&self, accumulation: Accumulation) -> usize {
        self.slots
            .iter()
            .filter(|slot| Self::lock(slot).participates(accumulation))
            .count()
    }

    /// Average time over participating threads, with open intervals extended up to `now`.
    pub(crate) fn average_time(&self, accumulation: Accumulation, now: f64) -> f64 {
        self.average_over_participants(accumulation, |slot| slot.live_time(accumulation, now))
    }

    /// Average number of completed intervals over participating threads.
    #[expect(
        clippy::cast_precision_loss,
        reason = "call counts stay far below the precision limit of f64"
    )]
    pub(crate) fn average_count(&self, accumulation: Accumulation) -> f64 {
        self.average_over_participants(accumulation, |slot| {
            slot.accumulator(accumulation).count as f64
        })
    }

    /// Average work units over participating threads.
    ///
    /// Returns `None` if the work units are undefined on any participating thread or if no
    /// thread participates.
    pub(crate) fn average_work_units(&self, accumulation: Accumulation) -> Option<f64> {
        let mut sum = 0.0;
        let mut participants: u32 = 0;

        for slot in &self.slots {
            let slot = Self::lock(slot);

            if !slot.participates(accumulation) {
                continue;
            }

            sum += slot.accumulator(accumulation).work_units?;
            participants = participants.saturating_add(1);
        }

        (participants > 0).then(|| sum / f64::from(participants))
    }

    /// Thread imbalance of the accumulated time, `(max - average) / max * n / (n - 1)`.
    ///
    /// Exactly 1.0 when fewer than two threads participate.
    pub(crate) fn time_imbalance(&self, accumulation: Accumulation, now: f64) -> f64 {
        let times = self
            .slots
            .iter()
            .map(Self::lock)
            .filter(|slot| slot.participates(accumulation))
            .map(|slot| slot.live_time(accumulation, now))
            .collect::<Vec<_>>();

        let Ok(participants) = u32::try_from(times.len()) else {
            return 0.0;
        };

        if participants < 2 {
            return 1.0;
        }

        let n = f64::from(participants);
        let max = times.iter().copied().fold(f64::MIN, f64::max);

        if max <= 0.0 {
            return 0.0;
        }

        let average = times.iter().sum::<f64>() / n;

        (max - average) / max * n / (n - 1.0)
    }

    /// Clears the accumulated totals and rebases open intervals to `now`.
    pub(crate) fn reset(&self, accumulation: Accumulation, now: f64) {
        for slot in &self.slots {
            let mut slot = Self::lock(slot);
            let active = slot.active;
            slot.accumulator_mut(accumulation).reset(now, active);
        }
    }

    /// Moves the start of every open interval forward by `delta` seconds.
    pub(crate) fn shift_start_time(&self, accumulation: Accumulation, delta: f64) {
        for slot in &self.slots {
            let mut slot = Self::lock(slot);

            if slot.active {
                slot.accumulator_mut(accumulation).start_time += delta;
            }
        }
    }

    /// A string that changes whenever the label, groups or work unit label change.
    ///
    /// Every component is length-prefixed so that moving characters between neighboring
    /// components yields a different string.
    pub(crate) fn hashable_string(&self) -> String {
        let mut text = String::new();

        push_component(&mut text, &self.label);

        for group in &self.groups {
            push_component(&mut text, group);
        }

        text.push('|');
        push_component(&mut text, self.work_unit_label());

        text
    }

    fn average_over_participants(
        &self,
        accumulation: Accumulation,
        value: impl Fn(&ThreadSlot) -> f64,
    ) -> f64 {
        let mut sum = 0.0;
        let mut participants: u32 = 0;

        for slot in &self.slots {
            let slot = Self::lock(slot);

            if slot.participates(accumulation) {
                sum += value(&slot);
                participants = participants.saturating_add(1);
            }
        }

        if participants == 0 {
            0.0
        } else {
            sum / f64::from(participants)
        }
    }

    fn slot(&self, thread: usize) -> MutexGuard<'_, ThreadSlot> {
        // The tree validates thread indexes against the team size before calling us.
        let slot = self
            .slots
            .get(thread)
            .expect("thread index is validated against the team size by the timer tree");

        Self::lock(slot)
    }

    fn lock(slot: &Mutex<ThreadSlot>) -> MutexGuard<'_, ThreadSlot> {
        slot.lock().expect(ERR_POISONED_LOCK)
    }
}

fn push_component(text: &mut String, component: &str) {
    text.push_str(&component.len().to_string());
    text.push(':');
    text.push_str(component);
}
