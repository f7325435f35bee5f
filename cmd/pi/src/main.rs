//! Monte Carlo pi estimator.
//!
//! Spawns one task per worker onto the pool's central FIFO, each
//! sampling random points in the unit square and counting how many
//! land inside the quarter circle. `pool.depleted()` is the barrier
//! that tells the main thread every task has finished before it
//! reduces the per-task hit counts into a final estimate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use corio::{wait, Pool, PoolConfig};

const SAMPLES_PER_TASK: u64 = 2_000_000;

/// A small, seedable, allocation-free PRNG (SplitMix64) — good enough
/// for a Monte Carlo demo without pulling in a `rand` dependency the
/// rest of the workspace has no other use for.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        SplitMix64(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// A uniform f64 in `[0, 1)`.
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

fn main() {
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let pool = Pool::new(PoolConfig::new().num_workers(num_workers)).expect("pool start");
    let scheduler = pool.scheduler();

    let hits = Arc::new(AtomicU64::new(0));
    let samples = Arc::new(AtomicU64::new(0));

    for task in 0..num_workers {
        let hits = hits.clone();
        let samples = samples.clone();
        corio::spawn(
            scheduler.schedule(),
            TaskReceiver(move |()| {
                let mut rng = SplitMix64::new(0xC0FF_EE00 ^ task as u64);
                let mut local_hits = 0u64;
                for _ in 0..SAMPLES_PER_TASK {
                    let x = rng.next_unit();
                    let y = rng.next_unit();
                    if x * x + y * y <= 1.0 {
                        local_hits += 1;
                    }
                }
                hits.fetch_add(local_hits, Ordering::Relaxed);
                samples.fetch_add(SAMPLES_PER_TASK, Ordering::Relaxed);
            }),
        );
    }

    wait(pool.depleted()).expect("depleted barrier");

    let total_hits = hits.load(Ordering::Relaxed) as f64;
    let total_samples = samples.load(Ordering::Relaxed) as f64;
    let estimate = 4.0 * total_hits / total_samples;

    println!(
        "pi ~= {estimate:.6} ({} workers, {} samples)",
        num_workers, total_samples as u64
    );
}

struct TaskReceiver<F>(F);

impl<F> corio::Receiver<(), corio::CorioError> for TaskReceiver<F>
where
    F: FnOnce(()),
{
    fn set_value(self, value: ()) {
        (self.0)(value);
    }

    fn set_error(self, error: corio::CorioError) {
        eprintln!("corio-pi: task failed: {error}");
    }

    fn set_done(self) {}
}
