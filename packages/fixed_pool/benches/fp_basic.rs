//! Basic benchmarks for the `fixed_pool` crate, measured against the global allocator.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::ptr::NonNull;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use fixed_pool::{BlockingLock, FixedPool, GrowthPolicy};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = [u8; 48];
const TEST_VALUE: TestItem = [42; 48];

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fp_basic");

    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(FixedPool::<TestItem>::with_capacity(0).unwrap()));
            }

            start.elapsed()
        });
    });

    group.bench_function("build_1024", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(FixedPool::<TestItem>::with_capacity(1024).unwrap()));
            }

            start.elapsed()
        });
    });

    group.bench_function("malloc_free_spin", |b| {
        b.iter_custom(|iters| {
            let pool = FixedPool::<TestItem>::with_capacity(1).unwrap();

            let start = Instant::now();

            for _ in 0..iters {
                let ptr = black_box(pool.malloc().unwrap());

                // SAFETY: The pointer came from this pool and is not used afterwards.
                unsafe {
                    pool.free(ptr);
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("malloc_free_blocking", |b| {
        b.iter_custom(|iters| {
            let pool = FixedPool::<TestItem>::builder()
                .lock::<BlockingLock>()
                .initial_capacity(1)
                .build()
                .unwrap();

            let start = Instant::now();

            for _ in 0..iters {
                let ptr = black_box(pool.malloc().unwrap());

                // SAFETY: The pointer came from this pool and is not used afterwards.
                unsafe {
                    pool.free(ptr);
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("box_new_drop", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(Box::new(TEST_VALUE)));
            }

            start.elapsed()
        });
    });

    group.bench_function("grow_single_unit", |b| {
        b.iter_custom(|iters| {
            let pool = FixedPool::<TestItem>::with_capacity(0).unwrap();
            let mut ptrs = Vec::with_capacity(usize::try_from(iters).unwrap());

            let start = Instant::now();

            for _ in 0..iters {
                ptrs.push(black_box(pool.malloc().unwrap()));
            }

            let elapsed = start.elapsed();

            free_all(&pool, ptrs);

            elapsed
        });
    });

    group.bench_function("grow_geometric", |b| {
        b.iter_custom(|iters| {
            let pool = FixedPool::<TestItem>::builder()
                .growth_policy(GrowthPolicy::Geometric)
                .build()
                .unwrap();
            let mut ptrs = Vec::with_capacity(usize::try_from(iters).unwrap());

            let start = Instant::now();

            for _ in 0..iters {
                ptrs.push(black_box(pool.malloc().unwrap()));
            }

            let elapsed = start.elapsed();

            free_all(&pool, ptrs);

            elapsed
        });
    });

    group.bench_function("statistics", |b| {
        b.iter_custom(|iters| {
            let pools = iter::repeat_with(|| FixedPool::<TestItem>::with_capacity(16).unwrap())
                .take(4)
                .collect::<Vec<_>>();

            let start = Instant::now();

            for (_, pool) in (0..iters).zip(pools.iter().cycle()) {
                _ = black_box(pool.statistics());
            }

            start.elapsed()
        });
    });

    group.finish();
}

fn free_all(pool: &FixedPool<TestItem>, ptrs: Vec<NonNull<TestItem>>) {
    for ptr in ptrs {
        // SAFETY: Every pointer came from this pool and is not used afterwards.
        unsafe {
            pool.free(ptr);
        }
    }
}
