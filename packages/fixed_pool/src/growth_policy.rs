/// Determines how many units a [`FixedPool`][crate::FixedPool] adds when `malloc()` finds the
/// free list empty.
///
/// Growth is unconditional: whenever the free list is exhausted, the pool requests new pages
/// from the operating system before `malloc()` returns. Each growth event is a separate
/// mapping request that happens while the pool lock is held.
///
/// # Examples
///
/// ```
/// use fixed_pool::{FixedPool, GrowthPolicy};
///
/// let pool = FixedPool::<u64>::builder()
///     .initial_capacity(4)
///     .growth_policy(GrowthPolicy::Geometric)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.growth_policy(), GrowthPolicy::Geometric);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum GrowthPolicy {
    /// Each growth event maps just enough pages for one additional unit. This is the default.
    ///
    /// Once the initial capacity is exceeded under sustained load, this issues one mapping
    /// request per allocation. It keeps the memory footprint tight at the cost of throughput.
    #[default]
    SingleUnit,

    /// Each growth event adds as many units as the pool already has (at least one), doubling
    /// the capacity.
    Geometric,
}

impl GrowthPolicy {
    /// The number of units to add to a pool that currently holds `total_units` units, all of
    /// which are allocated.
    #[must_use]
    pub(crate) fn units_to_add(self, total_units: usize) -> usize {
        match self {
            Self::SingleUnit => 1,
            Self::Geometric => total_units.max(1),
        }
    }
}
