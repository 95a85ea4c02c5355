use std::cell::Cell;
use std::fmt::Debug;
use std::num::NonZero;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Describes the threads of one worker that may call into a [`Profiler`][crate::Profiler].
///
/// Every timer keeps one accumulator slot per thread, indexed by
/// [`current_thread_index()`][Self::current_thread_index]. The thread count is read once when
/// the profiler is built and must not change afterwards.
pub trait ThreadTeam: Debug + Send + Sync + 'static {
    /// The largest number of threads that will ever run in a parallel region of this team.
    fn max_threads(&self) -> NonZero<usize>;

    /// The index of the calling thread within the team, in `0..max_threads()`.
    ///
    /// Outside a parallel region this is the index of the thread that runs sequential code,
    /// conventionally 0.
    fn current_thread_index(&self) -> usize;

    /// Whether the calling thread is currently executing inside a parallel region.
    ///
    /// Outside a parallel region, moving the timer position applies to all threads of the team
    /// at once. Inside one, it applies to the calling thread only.
    fn in_parallel_region(&self) -> bool;
}

/// A team made of a single thread. This is the default team of a profiler.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleThreaded;

impl ThreadTeam for SingleThreaded {
    fn max_threads(&self) -> NonZero<usize> {
        NonZero::<usize>::MIN
    }

    fn current_thread_index(&self) -> usize {
        0
    }

    fn in_parallel_region(&self) -> bool {
        false
    }
}

static NEXT_TEAM_ID: AtomicU64 = AtomicU64::new(0);

// The team whose parallel region the current thread runs in, and the index within that team.
thread_local! {
    static TEAM_THREAD: Cell<Option<(u64, usize)>> = const { Cell::new(None) };
}

/// A fork-join team that runs parallel regions on scoped OS threads.
///
/// Clones describe the same team. A thread takes part in at most one parallel region at a time.
/// Parallel regions of other teams, including other teams of the same size, are seen as
/// sequential code by this team.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use nested_timers::{Profiler, ScopedTeam};
///
/// let team = ScopedTeam::new(NonZero::new(4).unwrap());
/// let profiler = Profiler::builder().team(team.clone()).build();
///
/// team.parallel(|_| {
///     profiler.start("work").unwrap();
///     profiler.stop("work").unwrap();
/// });
/// ```
#[derive(Clone, Debug)]
pub struct ScopedTeam {
    id: u64,
    threads: NonZero<usize>,
}

impl ScopedTeam {
    /// Creates a team of `threads` threads.
    #[must_use]
    pub fn new(threads: NonZero<usize>) -> Self {
        Self {
            id: NEXT_TEAM_ID.fetch_add(1, Ordering::Relaxed),
            threads,
        }
    }

    /// Runs `body` once on every thread of the team and returns the results in thread order.
    ///
    /// The body receives the index of the thread it runs on. The call returns once every
    /// thread has finished.
    ///
    /// # Panics
    ///
    /// Resumes the panic of a team thread whose body panicked.
    pub fn parallel<F, R>(&self, body: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync,
        R: Send,
    {
        let body = &body;
        let team = self.id;

        thread::scope(|scope| {
            let handles = (0..self.threads.get())
                .map(|index| {
                    scope.spawn(move || {
                        TEAM_THREAD.with(|cell| cell.set(Some((team, index))));
                        let result = body(index);
                        TEAM_THREAD.with(|cell| cell.set(None));
                        result
                    })
                })
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

    // The index of the calling thread if it runs in a parallel region of this team.
    fn region_index(&self) -> Option<usize> {
        TEAM_THREAD
            .with(Cell::get)
            .filter(|(team, _)| *team == self.id)
            .map(|(_, index)| index)
    }
}

impl ThreadTeam for ScopedTeam {
    fn max_threads(&self) -> NonZero<usize> {
        self.threads
    }

    fn current_thread_index(&self) -> usize {
        self.region_index().unwrap_or(0)
    }

    fn in_parallel_region(&self) -> bool {
        self.region_index().is_some()
    }
}
