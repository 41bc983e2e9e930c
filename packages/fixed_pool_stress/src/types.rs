use std::fmt;
use std::str::FromStr;

use fixed_pool::{GrowthPolicy, PoolStats};

/// Which lock the pool under test uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum LockKind {
    /// [`fixed_pool::SpinLock`].
    #[default]
    Spin,
    /// [`fixed_pool::BlockingLock`].
    Blocking,
}

impl FromStr for LockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spin" => Ok(Self::Spin),
            "blocking" => Ok(Self::Blocking),
            _ => Err(format!(
                "Invalid lock: '{s}'. Valid options are: spin, blocking"
            )),
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spin => write!(f, "spin"),
            Self::Blocking => write!(f, "blocking"),
        }
    }
}

/// Parses a [`GrowthPolicy`] from its command-line name.
///
/// # Errors
///
/// Returns a human-readable message if the name is not recognized.
pub fn parse_growth_policy(s: &str) -> Result<GrowthPolicy, String> {
    match s.to_lowercase().as_str() {
        "single" => Ok(GrowthPolicy::SingleUnit),
        "geometric" => Ok(GrowthPolicy::Geometric),
        _ => Err(format!(
            "Invalid growth policy: '{s}'. Valid options are: single, geometric"
        )),
    }
}

/// Parameters of one stress run.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(
    clippy::exhaustive_structs,
    reason = "Plain parameter bag filled in by the binary and by tests"
)]
pub struct RunInput {
    /// Number of worker threads sharing the pool.
    pub threads: usize,
    /// Number of units each thread allocates before freeing them all.
    pub iterations: usize,
    /// Units pre-allocated when the pool is built.
    pub capacity: usize,
    /// Lock serializing access to the pool.
    pub lock: LockKind,
    /// Growth policy applied when the pool runs out of units.
    pub growth_policy: GrowthPolicy,
    /// Also run the workload against the global allocator.
    pub compare_system: bool,
}

/// What a stress run observed.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RunReport {
    /// Pool statistics after all threads allocated their batch, before anything was freed.
    pub peak: PoolStats,
    /// Pool statistics after all threads freed their batch.
    pub end: PoolStats,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "at peak: {}", self.peak)?;
        write!(f, "at end:  {}", self.end)
    }
}
