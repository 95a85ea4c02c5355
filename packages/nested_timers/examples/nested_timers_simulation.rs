//! A small simulation run by a group of workers, each with a team of threads.
//!
//! Every worker propagates its share of cells in parallel, exchanges results with the other
//! workers and appends a snapshot of the interval statistics to a log after every step. One
//! worker does extra work, which shows up as imbalance in the final report.
//!
//! The reports are written to the system temporary directory.
//!
//! Run with: `cargo run --example nested_timers_simulation`.

use std::env;
use std::hint::black_box;
use std::num::NonZero;

use nested_timers::{
    Communicator, LocalGroup, LogOptions, PrintOptions, Profiler, ReduceOp, ScopedTeam,
    TimerOptions,
};

const WORKERS: NonZero<usize> = NonZero::new(4).unwrap();
const THREADS: NonZero<usize> = NonZero::new(2).unwrap();

const STEPS: u32 = 5;
const CELLS_PER_THREAD: u32 = 200_000;

fn propagate(cells: u32) -> f64 {
    (0..cells).fold(0.0, |energy, cell| {
        black_box(energy + f64::from(cell).sqrt())
    })
}

fn main() {
    let prefix = env::temp_dir().join("nested_timers");
    let prefix = prefix.to_string_lossy().into_owned();

    LocalGroup::new(WORKERS).run(|comm| {
        let team = ScopedTeam::new(THREADS);
        let profiler = Profiler::builder().team(team.clone()).build();

        // The last worker owns a denser part of the domain.
        let cells = if comm.rank().saturating_add(1) == comm.size() {
            CELLS_PER_THREAD.saturating_mul(2)
        } else {
            CELLS_PER_THREAD
        };

        let exchange = profiler
            .initialize_timer("exchange", &TimerOptions::new().group("MPI"))
            .unwrap();

        profiler.start("simulation").unwrap();

        for step in 0..STEPS {
            profiler.start("step").unwrap();

            profiler.start("propagate").unwrap();
            let energies = team.parallel(|_| {
                profiler.start("cells").unwrap();
                let energy = propagate(cells);
                profiler
                    .stop_with_units("cells", f64::from(cells), "cells")
                    .unwrap();
                energy
            });
            profiler.stop("propagate").unwrap();

            profiler.start_id(exchange).unwrap();
            let total = comm
                .reduce_f64(&[energies.iter().sum()], ReduceOp::Sum, 0)
                .unwrap();
            profiler.stop_id(exchange).unwrap();

            profiler.stop("step").unwrap();

            profiler
                .print_log(
                    &comm,
                    &LogOptions::new()
                        .file_prefix(format!("{prefix}_log"))
                        .max_level(3)
                        .simulation_time(f64::from(step)),
                )
                .unwrap();

            if let Some(total) = total {
                println!("step {step}: total energy {:.3e}", total.iter().sum::<f64>());
            }
        }

        profiler.stop("simulation").unwrap();

        profiler
            .print(&comm, &PrintOptions::new().file_prefix(prefix.clone()))
            .unwrap();
    });

    println!("Reports written to {prefix}_0.txt and {prefix}_log_<fingerprint>.txt");
}
