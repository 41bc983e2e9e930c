use std::fmt;

/// A snapshot of the state of a [`FixedPool`][crate::FixedPool].
///
/// Obtained from [`FixedPool::statistics()`][crate::FixedPool::statistics]. Taking a snapshot has
/// no effect on the pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    allocated_units: usize,
    total_units: usize,
    allocated_pages: usize,
    regions: usize,
}

impl PoolStats {
    pub(crate) fn new(
        allocated_units: usize,
        total_units: usize,
        allocated_pages: usize,
        regions: usize,
    ) -> Self {
        Self {
            allocated_units,
            total_units,
            allocated_pages,
            regions,
        }
    }

    /// Number of units currently handed out to callers.
    #[must_use]
    pub fn allocated_units(&self) -> usize {
        self.allocated_units
    }

    /// Number of units the pool has carved out of its pages, whether allocated or not.
    #[must_use]
    pub fn total_units(&self) -> usize {
        self.total_units
    }

    /// Number of units available for allocation without growing the pool.
    #[must_use]
    pub fn free_units(&self) -> usize {
        self.total_units.saturating_sub(self.allocated_units)
    }

    /// Number of virtual memory pages the pool has obtained from the operating system.
    #[must_use]
    pub fn allocated_pages(&self) -> usize {
        self.allocated_pages
    }

    /// Number of separate page regions, which equals the number of times the pool has asked the
    /// operating system for memory.
    #[must_use]
    pub fn regions(&self) -> usize {
        self.regions
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} units allocated, {} pages in {} regions",
            self.allocated_units, self.total_units, self.allocated_pages, self.regions
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn free_units_is_difference() {
        let stats = PoolStats::new(3, 10, 1, 1);

        assert_eq!(stats.free_units(), 7);
        assert_eq!(stats.allocated_units(), 3);
        assert_eq!(stats.total_units(), 10);
        assert_eq!(stats.allocated_pages(), 1);
        assert_eq!(stats.regions(), 1);
    }

    #[test]
    fn display_lists_all_counters() {
        let stats = PoolStats::new(3, 10, 2, 1);

        assert_eq!(
            stats.to_string(),
            "3 of 10 units allocated, 2 pages in 1 regions"
        );
    }
}
