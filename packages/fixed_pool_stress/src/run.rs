use std::hint::black_box;
use std::ptr::NonNull;
use std::sync::Barrier;
use std::thread;

use fixed_pool::{BlockingLock, FixedPool, RawLock, SpinLock};
use tracing::{debug, info};

use crate::{LockKind, Measure, RunInput, RunReport};

/// The element type the harness allocates. Sized like a small record with a few fields.
pub type Payload = [u64; 4];

/// An error that aborts a stress run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RunError {
    /// The pool could not be built or could not grow.
    #[error("pool operation failed: {0}")]
    Pool(#[from] fixed_pool::Error),

    /// A worker thread panicked.
    #[error("worker thread {index} panicked")]
    WorkerPanicked {
        /// Index of the thread that panicked.
        index: usize,
    },
}

/// Executes one stress run as described by `input`.
///
/// Every thread allocates `iterations` units, stamps each with a value identifying the thread,
/// waits for all other threads to reach the same point and then verifies and frees its units.
///
/// # Errors
///
/// Returns an error if the pool cannot be built or grown, or if any worker thread panics.
pub fn run(input: &RunInput) -> Result<RunReport, RunError> {
    info!(
        threads = input.threads,
        iterations = input.iterations,
        capacity = input.capacity,
        lock = %input.lock,
        growth_policy = ?input.growth_policy,
        "starting stress run"
    );

    let report = match input.lock {
        LockKind::Spin => run_with_lock::<SpinLock>(input)?,
        LockKind::Blocking => run_with_lock::<BlockingLock>(input)?,
    };

    if input.compare_system {
        run_system(input)?;
    }

    Ok(report)
}

fn run_with_lock<L: RawLock>(input: &RunInput) -> Result<RunReport, RunError> {
    let pool = {
        let _measure = Measure::new("build pool");

        FixedPool::<Payload>::builder()
            .lock::<L>()
            .initial_capacity(input.capacity)
            .growth_policy(input.growth_policy)
            .build()?
    };

    debug!(?pool, "pool built");

    // Reached once all threads hold their full batch, so the peak can be observed.
    let allocated = Barrier::new(input.threads.saturating_add(1));
    // Released once the peak has been observed.
    let observed = Barrier::new(input.threads.saturating_add(1));

    let _measure = Measure::new("fixed_pool total");

    let peak = thread::scope(|s| {
        let workers: Vec<_> = (0..input.threads)
            .map(|index| {
                let pool = &pool;
                let allocated = &allocated;
                let observed = &observed;

                s.spawn(move || -> Result<(), RunError> {
                    let mut rendezvous = Rendezvous::new(allocated, observed);

                    let stamp = u64::try_from(index).expect("thread index always fits in u64");

                    let batch = {
                        let _measure = Measure::new("fixed_pool malloc");
                        allocate_batch(pool, input.iterations, stamp)
                    };

                    rendezvous.reach();

                    let batch = batch?;

                    let _measure = Measure::new("fixed_pool free");

                    for ptr in batch {
                        // SAFETY: Every unit was stamped by this thread in allocate_batch().
                        let value = unsafe { ptr.read() };
                        assert_eq!(value, [stamp; 4], "unit was overwritten by another thread");

                        // SAFETY: The pointer came from this pool and is not used afterwards.
                        unsafe {
                            pool.free(ptr);
                        }
                    }

                    Ok(())
                })
            })
            .collect();

        allocated.wait();
        let peak = pool.statistics();
        observed.wait();

        for (index, worker) in workers.into_iter().enumerate() {
            worker
                .join()
                .map_err(|_| RunError::WorkerPanicked { index })??;
        }

        Ok::<_, RunError>(peak)
    })?;

    let end = pool.statistics();

    info!(%peak, %end, "stress run finished");

    Ok(RunReport { peak, end })
}

/// Waits on both peak barriers exactly once: either when [`reach()`](Self::reach) is called or,
/// if the worker panics before that, when the guard is dropped during unwinding. Either way the
/// coordinating thread gets past the barriers and observes the panic when joining.
#[derive(Debug)]
struct Rendezvous<'a> {
    allocated: &'a Barrier,
    observed: &'a Barrier,
    reached: bool,
}

impl<'a> Rendezvous<'a> {
    fn new(allocated: &'a Barrier, observed: &'a Barrier) -> Self {
        Self {
            allocated,
            observed,
            reached: false,
        }
    }

    fn reach(&mut self) {
        if self.reached {
            return;
        }

        self.reached = true;
        self.allocated.wait();
        self.observed.wait();
    }
}

impl Drop for Rendezvous<'_> {
    fn drop(&mut self) {
        self.reach();
    }
}

/// Allocates `count` units and stamps each with `stamp`. On failure, whatever was allocated so
/// far is returned to the pool.
fn allocate_batch<L: RawLock>(
    pool: &FixedPool<Payload, L>,
    count: usize,
    stamp: u64,
) -> Result<Vec<NonNull<Payload>>, RunError> {
    let mut batch = Vec::with_capacity(count);

    for _ in 0..count {
        match pool.malloc() {
            Ok(ptr) => {
                // SAFETY: The storage is exclusively ours and big enough for a Payload.
                unsafe {
                    ptr.write([stamp; 4]);
                }

                batch.push(ptr);
            }
            Err(e) => {
                for ptr in batch {
                    // SAFETY: The pointer came from this pool and is not used afterwards.
                    unsafe {
                        pool.free(ptr);
                    }
                }

                return Err(e.into());
            }
        }
    }

    Ok(batch)
}

/// The same workload as [`run_with_lock()`], using the global allocator via [`Box`].
fn run_system(input: &RunInput) -> Result<(), RunError> {
    let _measure = Measure::new("system total");

    thread::scope(|s| {
        let workers: Vec<_> = (0..input.threads)
            .map(|index| {
                s.spawn(move || {
                    let stamp = u64::try_from(index).expect("thread index always fits in u64");

                    let batch: Vec<Box<Payload>> = {
                        let _measure = Measure::new("system malloc");
                        (0..input.iterations)
                            .map(|_| Box::new([stamp; 4]))
                            .collect()
                    };

                    let _measure = Measure::new("system free");
                    drop(black_box(batch));
                })
            })
            .collect();

        for (index, worker) in workers.into_iter().enumerate() {
            worker
                .join()
                .map_err(|_| RunError::WorkerPanicked { index })?;
        }

        Ok(())
    })
}
