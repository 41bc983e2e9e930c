//! Thread safety integration tests for `fixed_pool`.
//!
//! These tests hammer a shared pool from many threads, each working only with pointers it
//! obtained itself, and verify that the pool counters come out consistent.

use std::collections::HashSet;
use std::ptr::{self, NonNull};
use std::sync::Mutex;
use std::thread;

use fixed_pool::{BlockingLock, FixedPool, GrowthPolicy, RawLock, SpinLock};

const THREADS: usize = 8;
const CYCLES: usize = 5_000;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Record {
    thread: usize,
    sequence: usize,
}

fn alternating_cycles<L: RawLock>(pool: &FixedPool<Record, L>) {
    let total_before = pool.statistics().total_units();

    thread::scope(|s| {
        for thread in 0..THREADS {
            s.spawn(move || {
                for sequence in 0..CYCLES {
                    let ptr = pool.malloc().unwrap();
                    let record = Record { thread, sequence };

                    // SAFETY: The storage is exclusively ours until we free it.
                    unsafe {
                        ptr.write(record);
                        assert_eq!(ptr.read(), record);
                        pool.free(ptr);
                    }
                }
            });
        }
    });

    let stats = pool.statistics();
    assert_eq!(stats.allocated_units(), 0);
    assert_eq!(stats.total_units(), total_before);
}

#[test]
#[cfg_attr(miri, ignore)] // Too slow under Miri.
fn alternating_cycles_with_spin_lock() {
    let pool = FixedPool::<Record, SpinLock>::with_capacity(THREADS).unwrap();

    alternating_cycles(&pool);
}

#[test]
#[cfg_attr(miri, ignore)] // Too slow under Miri.
fn alternating_cycles_with_blocking_lock() {
    let pool = FixedPool::<Record>::builder()
        .lock::<BlockingLock>()
        .initial_capacity(THREADS)
        .build()
        .unwrap();

    alternating_cycles(&pool);
}

#[test]
#[cfg_attr(miri, ignore)] // Too slow under Miri.
fn batch_allocations_grow_under_contention() {
    const BATCH: usize = 200;

    let pool = FixedPool::<Record>::with_capacity(10).unwrap();

    thread::scope(|s| {
        for thread in 0..THREADS {
            let pool = &pool;

            s.spawn(move || {
                for _ in 0..5 {
                    let ptrs: Vec<_> = (0..BATCH)
                        .map(|sequence| {
                            let ptr = pool.malloc().unwrap();

                            // SAFETY: The storage is exclusively ours until we free it.
                            unsafe {
                                ptr.write(Record { thread, sequence });
                            }

                            ptr
                        })
                        .collect();

                    for (sequence, ptr) in ptrs.into_iter().enumerate() {
                        // SAFETY: Initialized above and only we have access to it.
                        unsafe {
                            assert_eq!(ptr.read(), Record { thread, sequence });
                            pool.free(ptr);
                        }
                    }
                }
            });
        }
    });

    let stats = pool.statistics();
    assert_eq!(stats.allocated_units(), 0);
    assert!(stats.total_units() >= 10);
    assert!(stats.total_units() <= 10.max(THREADS * BATCH));
}

#[test]
#[cfg_attr(miri, ignore)] // Too slow under Miri.
fn concurrent_live_pointers_are_unique() {
    const PER_THREAD: usize = 500;

    let pool = FixedPool::<u64>::builder()
        .initial_capacity(64)
        .growth_policy(GrowthPolicy::Geometric)
        .build()
        .unwrap();

    let collected = Mutex::new(Vec::new());

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let ptrs: Vec<_> = (0..PER_THREAD)
                    .map(|_| pool.malloc().unwrap().as_ptr().expose_provenance())
                    .collect();

                collected.lock().unwrap().extend(ptrs);
            });
        }
    });

    let collected = collected.into_inner().unwrap();
    let unique: HashSet<_> = collected.iter().copied().collect();

    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert_eq!(pool.statistics().allocated_units(), THREADS * PER_THREAD);

    for address in collected {
        let ptr = NonNull::new(ptr::with_exposed_provenance_mut::<u64>(address)).unwrap();

        // SAFETY: Every address came from this pool, with its provenance exposed, and is freed
        // exactly once.
        unsafe {
            pool.free(ptr);
        }
    }

    assert_eq!(pool.statistics().allocated_units(), 0);
}
