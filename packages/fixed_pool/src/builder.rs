use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::pal::PlatformFacade;
use crate::{
    Error, FixedPool, GrowthPolicy, PageSize, PageSource, RawLock, Result, SpinLock, UnitLayout,
};

/// Builder for creating an instance of [`FixedPool`].
///
/// All settings are optional. By default the pool pre-allocates nothing, grows one unit at a
/// time, uses the page size of the operating system and serializes access with a [`SpinLock`].
///
/// # Examples
///
/// ```
/// use fixed_pool::{BlockingLock, FixedPool, GrowthPolicy};
///
/// let pool = FixedPool::<[u8; 48]>::builder()
///     .initial_capacity(1024)
///     .growth_policy(GrowthPolicy::Geometric)
///     .lock::<BlockingLock>()
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.statistics().total_units(), 1024);
/// ```
#[must_use]
pub struct FixedPoolBuilder<T, L = SpinLock> {
    initial_capacity: usize,
    growth_policy: GrowthPolicy,
    page_size: Option<PageSize>,
    platform: PlatformFacade,

    _types: PhantomData<fn() -> (T, L)>,
}

impl<T, L: RawLock> FixedPoolBuilder<T, L> {
    pub(crate) fn new() -> Self {
        Self {
            initial_capacity: 0,
            growth_policy: GrowthPolicy::default(),
            page_size: None,
            platform: PlatformFacade::target(),
            _types: PhantomData,
        }
    }

    /// Sets the number of units to pre-allocate when the pool is built.
    ///
    /// Zero (the default) means nothing is pre-allocated and the first `malloc()` grows the pool.
    pub fn initial_capacity(mut self, units: usize) -> Self {
        self.initial_capacity = units;
        self
    }

    /// Sets the [growth policy][GrowthPolicy] applied when the free list runs out.
    pub fn growth_policy(mut self, policy: GrowthPolicy) -> Self {
        self.growth_policy = policy;
        self
    }

    /// Sets the page size the pool rounds its memory requests to.
    ///
    /// By default, the page size of the operating system is used. Overriding it with a multiple
    /// of the real page size makes the pool request memory in larger chunks. Anything else is
    /// rejected by [`build()`](Self::build).
    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Selects the lock that serializes access to the pool.
    pub fn lock<L2: RawLock>(self) -> FixedPoolBuilder<T, L2> {
        FixedPoolBuilder {
            initial_capacity: self.initial_capacity,
            growth_policy: self.growth_policy,
            page_size: self.page_size,
            platform: self.platform,
            _types: PhantomData,
        }
    }

    #[cfg(test)]
    pub(crate) fn platform(mut self, platform: PlatformFacade) -> Self {
        self.platform = platform;
        self
    }

    /// Builds the pool, pre-allocating the initial capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhaustion`] if the operating system refuses to provide memory
    /// for the initial capacity, [`Error::CapacityOverflow`] if the initial capacity cannot fit
    /// in the address space and [`Error::InvalidPageSize`] if the page size is not a multiple of
    /// the operating system page size or the operating system page size is smaller than the
    /// alignment of a unit.
    ///
    /// # Panics
    ///
    /// Panics if `T` is a zero-sized type.
    pub fn build(self) -> Result<FixedPool<T, L>> {
        let unit_layout = UnitLayout::of::<T>();

        let os_page_size = PageSize::from_platform(&self.platform);
        let page_size = self.page_size.unwrap_or(os_page_size);

        // Both are powers of two, so this also rules out anything below the OS page size.
        if page_size.get() < os_page_size.get() {
            return Err(Error::InvalidPageSize {
                page_size: page_size.get(),
                problem: "page size is not a multiple of the operating system page size",
            });
        }

        // Regions are only guaranteed to be aligned to the OS page size.
        if os_page_size.get() < unit_layout.align() {
            return Err(Error::InvalidPageSize {
                page_size: page_size.get(),
                problem: "operating system page size is smaller than the alignment of a unit",
            });
        }

        FixedPool::new_inner(
            unit_layout,
            self.initial_capacity,
            self.growth_policy,
            PageSource::new(self.platform, page_size),
        )
    }
}

impl<T, L> fmt::Debug for FixedPoolBuilder<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("initial_capacity", &self.initial_capacity)
            .field("growth_policy", &self.growth_policy)
            .field("page_size", &self.page_size)
            .field("platform", &self.platform)
            .finish()
    }
}
