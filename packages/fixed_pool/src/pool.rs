use std::any::type_name;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use tracing::{debug, error, trace};

use crate::{
    FixedPoolBuilder, FreeList, GrowthPolicy, LockGuard, PageRegion, PageSize, PageSource,
    PoolStats, RawLock, Result, SpinLock, UnitLayout,
};

/// A thread-safe pool of fixed-size storage units for values of type `T`.
///
/// The pool carves units out of virtual memory pages obtained directly from the operating system
/// and recycles them through an intrusive last-in-first-out free list. [`malloc()`][Self::malloc]
/// hands out a pointer to uninitialized-or-stale storage big enough for one `T` and
/// [`free()`][Self::free] takes it back. When the free list runs dry, `malloc()` grows the pool
/// according to its [`GrowthPolicy`].
///
/// # Raw storage only
///
/// The pool never creates or drops a `T`. The storage behind a pointer returned from `malloc()`
/// was zero-filled when its page was first obtained but is **not** cleared on reuse, so it may
/// contain whatever a previous user left behind. Writing a value into the storage, and dropping
/// that value before calling `free()`, is entirely the caller's responsibility.
///
/// # Memory lifecycle
///
/// Pages are never returned to the operating system while the pool is alive, no matter how many
/// units are free. Dropping the pool returns all pages at once, which leaves any pointers that
/// are still outstanding dangling.
///
/// # Thread safety
///
/// The pool is thread-safe ([`Send`] and [`Sync`]). All operations are serialized by a single
/// lock of type `L` (by default a [`SpinLock`]), making concurrent calls equivalent to some
/// total order of calls. Growth maps new pages while the lock is held, so under contention other
/// threads wait for the operating system as well.
///
/// # Examples
///
/// ```
/// use fixed_pool::FixedPool;
///
/// struct Person {
///     age: i32,
/// }
///
/// let pool = FixedPool::<Person>::with_capacity(10).unwrap();
///
/// let person = pool.malloc().unwrap();
///
/// // SAFETY: The storage is big enough for a Person and nobody else has access to it.
/// unsafe {
///     person.write(Person { age: 32 });
///     assert_eq!(person.as_ref().age, 32);
/// }
///
/// // Person has no drop logic, so we can simply return the storage.
/// // SAFETY: The pointer came from this pool and is not used after this.
/// unsafe {
///     pool.free(person);
/// }
///
/// assert_eq!(pool.statistics().allocated_units(), 0);
/// ```
pub struct FixedPool<T, L: RawLock = SpinLock> {
    lock: L,

    /// Only accessed while holding `lock`.
    state: UnsafeCell<PoolState>,

    unit_layout: UnitLayout,
    growth_policy: GrowthPolicy,
    page_source: PageSource,

    // The pool stores no values of type T, it only hands out storage for them.
    _element: PhantomData<fn() -> T>,
}

#[derive(Debug, Default)]
struct PoolState {
    free_list: FreeList,

    /// Appended to on every growth event, only emptied when the pool is dropped.
    regions: Vec<PageRegion>,

    total_units: usize,
    allocated_units: usize,
    allocated_pages: usize,
}

impl PoolState {
    /// Every unit is either handed out or on the free list.
    fn debug_assert_consistent(&self) {
        debug_assert_eq!(
            self.allocated_units.wrapping_add(self.free_list.len()),
            self.total_units,
            "allocated and free units do not add up to the total"
        );
    }
}

// SAFETY: The pool hands out raw storage and never holds a T, so it does not matter which thread
// the pool is on. The raw pointers in the state refer to memory owned by the pool itself.
unsafe impl<T, L: RawLock> Send for FixedPool<T, L> {}

// SAFETY: All access to the mutable state goes through `lock`, which provides mutual exclusion.
unsafe impl<T, L: RawLock> Sync for FixedPool<T, L> {}

impl<T> FixedPool<T> {
    /// Creates a builder for configuring and constructing a [`FixedPool`].
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::{FixedPool, GrowthPolicy};
    ///
    /// let pool = FixedPool::<u64>::builder()
    ///     .initial_capacity(100)
    ///     .growth_policy(GrowthPolicy::Geometric)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.statistics().total_units(), 100);
    /// ```
    pub fn builder() -> FixedPoolBuilder<T> {
        FixedPoolBuilder::new()
    }

    /// Creates a pool with `initial_capacity` units pre-allocated, using default settings for
    /// everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory for the initial capacity cannot be obtained. See
    /// [`FixedPoolBuilder::build()`].
    ///
    /// # Panics
    ///
    /// Panics if `T` is a zero-sized type.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Self::builder().initial_capacity(initial_capacity).build()
    }
}

impl<T, L: RawLock> FixedPool<T, L> {
    pub(crate) fn new_inner(
        unit_layout: UnitLayout,
        initial_capacity: usize,
        growth_policy: GrowthPolicy,
        page_source: PageSource,
    ) -> Result<Self> {
        let mut pool = Self {
            lock: L::default(),
            state: UnsafeCell::new(PoolState::default()),
            unit_layout,
            growth_policy,
            page_source,
            _element: PhantomData,
        };

        if initial_capacity > 0 {
            let state = pool.state.get_mut();

            // If this fails, the partially constructed pool is dropped, releasing nothing
            // because no region was added.
            Self::grow(&pool.page_source, &pool.unit_layout, state, initial_capacity)?;
        }

        Ok(pool)
    }

    /// Hands out storage for one `T`.
    ///
    /// The storage is at least `size_of::<T>()` bytes. Its content is unspecified: it was zeroed
    /// when the containing page was obtained but is not cleared when a unit is reused.
    ///
    /// If no unit is free, the pool first grows according to its [`GrowthPolicy`]. This happens
    /// while the pool lock is held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhaustion`][crate::Error::ResourceExhaustion] if the pool needs
    /// to grow and the operating system refuses to provide more memory. The pool is unchanged in
    /// that case and remains usable.
    pub fn malloc(&self) -> Result<NonNull<T>> {
        let _guard = LockGuard::acquire(&self.lock);

        // SAFETY: We hold the lock, which grants exclusive access to the state.
        let state = unsafe { &mut *self.state.get() };

        if state.free_list.is_empty() {
            let units = self.growth_policy.units_to_add(state.total_units);

            trace!(
                units,
                total_units = state.total_units,
                element = type_name::<T>(),
                "free list exhausted, growing pool"
            );

            Self::grow(&self.page_source, &self.unit_layout, state, units)?;
        }

        let unit = state
            .free_list
            .pop()
            .expect("free list cannot be empty after successful growth");

        state.allocated_units = state
            .allocated_units
            .checked_add(1)
            .expect("cannot allocate more units than the pool contains");

        state.debug_assert_consistent();

        // SAFETY: The unit came from our free list, so it was laid out with our unit layout.
        let payload = unsafe { self.unit_layout.payload_of(unit) };

        Ok(payload.cast())
    }

    /// Returns storage obtained from [`malloc()`][Self::malloc] to the pool.
    ///
    /// The unit becomes the first candidate for the next `malloc()`. Any value the caller placed
    /// in the storage is not dropped.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that:
    ///
    /// * `ptr` was returned by `malloc()` on this same pool.
    /// * `ptr` has not been freed since it was returned by `malloc()`.
    /// * Neither `ptr` nor any pointer derived from it is used after this call.
    ///
    /// None of this is checked in release builds. Debug builds detect double frees and panic.
    pub unsafe fn free(&self, ptr: NonNull<T>) {
        // SAFETY: The caller guarantees that `ptr` is a payload this pool handed out.
        let unit = unsafe { self.unit_layout.unit_of(ptr.cast()) };

        let _guard = LockGuard::acquire(&self.lock);

        // SAFETY: We hold the lock, which grants exclusive access to the state.
        let state = unsafe { &mut *self.state.get() };

        state.allocated_units = state
            .allocated_units
            .checked_sub(1)
            .expect("more units freed than were allocated - caller contract violated");

        // SAFETY: The caller guarantees the unit is currently allocated from this pool, which
        // means it was popped from our free list and not pushed back since.
        unsafe {
            state.free_list.push(unit);
        }

        state.debug_assert_consistent();
    }

    /// Returns a snapshot of the pool counters. Has no effect on the pool.
    #[must_use]
    pub fn statistics(&self) -> PoolStats {
        let _guard = LockGuard::acquire(&self.lock);

        // SAFETY: We hold the lock. We only read from the state.
        let state = unsafe { &*self.state.get() };

        PoolStats::new(
            state.allocated_units,
            state.total_units,
            state.allocated_pages,
            state.regions.len(),
        )
    }

    /// How units are laid out within the pool's pages.
    #[must_use]
    pub fn unit_layout(&self) -> UnitLayout {
        self.unit_layout
    }

    /// The page size the pool rounds its memory requests to.
    #[must_use]
    pub fn page_size(&self) -> PageSize {
        self.page_source.page_size()
    }

    /// The policy applied when the free list runs out.
    #[must_use]
    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth_policy
    }

    /// Maps a new region for `units` units and puts all of them on the free list.
    ///
    /// Takes the pieces of the pool separately so it can be used both under the lock and
    /// during construction, when we have exclusive access anyway.
    fn grow(
        page_source: &PageSource,
        unit_layout: &UnitLayout,
        state: &mut PoolState,
        units: usize,
    ) -> Result<()> {
        let byte_count = unit_layout.bytes_for(units)?;
        let region = page_source.acquire(byte_count)?;

        for index in 0..units {
            // SAFETY: The region is page-aligned (and the page size is at least the unit
            // alignment, which the builder checks) and was sized for `units` units.
            let unit = unsafe { unit_layout.unit_at(region.base(), index) };

            // SAFETY: Units do not overlap and the region stays alive until the pool is dropped.
            unsafe {
                state.free_list.push_new(unit);
            }
        }

        state.total_units = state
            .total_units
            .checked_add(units)
            .expect("unit count cannot exceed the address space");
        state.allocated_pages = state
            .allocated_pages
            .checked_add(region.page_count())
            .expect("page count cannot exceed the address space");

        debug!(
            units,
            pages = region.page_count(),
            bytes = region.len(),
            total_units = state.total_units,
            "pool grew"
        );

        state.regions.push(region);

        Ok(())
    }

    #[cfg(test)]
    fn free_list_len(&self) -> usize {
        let _guard = LockGuard::acquire(&self.lock);

        // SAFETY: We hold the lock. We only read from the state.
        unsafe { &*self.state.get() }.free_list.len()
    }
}

impl<T, L: RawLock> Drop for FixedPool<T, L> {
    fn drop(&mut self) {
        let state = self.state.get_mut();

        if state.allocated_units > 0 {
            debug!(
                allocated_units = state.allocated_units,
                element = type_name::<T>(),
                "dropping pool with outstanding allocations, their storage is released"
            );
        }

        for region in state.regions.drain(..) {
            if let Err(e) = self.page_source.release(region) {
                error!(error = %e, "failed to release page region");
            }
        }
    }
}

impl<T, L: RawLock> fmt::Debug for FixedPool<T, L> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("statistics", &self.statistics())
            .field("unit_layout", &self.unit_layout)
            .field("growth_policy", &self.growth_policy)
            .field("page_source", &self.page_source)
            .finish_non_exhaustive()
    }
}
