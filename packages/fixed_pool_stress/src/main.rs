#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the `fixed_pool` stress harness.
//!
//! Set `RUST_LOG=info` (or `debug` for per-growth events) to see the timing output.

use std::process::ExitCode;

use argh::FromArgs;
use fixed_pool::GrowthPolicy;
use fixed_pool_stress::{LockKind, RunInput, parse_growth_policy, run};
use tracing_subscriber::EnvFilter;

/// Hammers a shared fixed_pool from many threads, timing every phase.
#[derive(FromArgs)]
struct Args {
    /// number of worker threads
    #[argh(option, default = "4")]
    threads: usize,

    /// units each thread allocates before freeing them all
    #[argh(option, default = "100_000")]
    iterations: usize,

    /// units pre-allocated when the pool is built
    #[argh(option, default = "0")]
    capacity: usize,

    /// lock serializing access to the pool (spin, blocking)
    #[argh(option, default = "LockKind::Spin")]
    lock: LockKind,

    /// growth policy when the pool runs out (single, geometric)
    #[argh(option, default = "GrowthPolicy::SingleUnit", from_str_fn(parse_growth_policy))]
    growth: GrowthPolicy,

    /// also run the same workload against the global allocator
    #[argh(switch)]
    compare_system: bool,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Args = argh::from_env();

    let input = RunInput {
        threads: args.threads,
        iterations: args.iterations,
        capacity: args.capacity,
        lock: args.lock,
        growth_policy: args.growth,
        compare_system: args.compare_system,
    };

    match run(&input) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
