#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Stress and timing harness for [`fixed_pool`].
//!
//! Spawns a number of threads that each allocate a batch of units from one shared pool and then
//! free them all again, timing every phase. Optionally runs the same workload against the global
//! allocator for comparison.
//!
//! This is the library half of the `fixed_pool_stress` binary, split out so the workload can be
//! exercised from tests.

mod measure;
mod run;
mod types;

pub use measure::*;
pub use run::*;
pub use types::*;
