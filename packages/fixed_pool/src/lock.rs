use std::fmt::{self, Debug};
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::lock_api::RawMutex as _;

/// A raw mutual exclusion primitive that a [`FixedPool`][crate::FixedPool] uses to serialize
/// every mutation of its free list, page inventory and counters.
///
/// The pool acquires the lock for the full duration of each critical section and releases it on
/// every exit path. The default is [`SpinLock`]; [`BlockingLock`] can be substituted for
/// deployments with heavy contention without any change to the allocation algorithm.
///
/// # Safety
///
/// The pool relies on the lock for the soundness of its safe API. Implementations must ensure
/// that between a call to [`lock()`](Self::lock) returning and the matching call to
/// [`unlock()`](Self::unlock), no other call to `lock()` on the same instance returns. Acquiring
/// the lock must synchronize with (have acquire ordering relative to) the previous release,
/// which in turn must have release ordering.
///
/// A lock that does not provide mutual exclusion cannot be plugged into a pool without `unsafe`:
///
/// ```compile_fail
/// use fixed_pool::RawLock;
///
/// #[derive(Default)]
/// struct NoLock;
///
/// impl RawLock for NoLock {
///     fn lock(&self) {}
///     unsafe fn unlock(&self) {}
/// }
/// ```
pub unsafe trait RawLock: Default + Send + Sync {
    /// Acquires the lock, waiting for as long as it takes.
    fn lock(&self);

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The caller must have acquired the lock via [`lock()`](Self::lock) and not yet released it.
    unsafe fn unlock(&self);
}

/// A busy-waiting lock built on an atomic test-and-set flag.
///
/// Waiters spin without backoff or queueing, so there is no fairness guarantee: under sustained
/// contention a waiter may be starved for an arbitrarily long time. It cannot deadlock because
/// the holder always releases the flag when its critical section ends.
///
/// # Examples
///
/// ```
/// use fixed_pool::{FixedPool, SpinLock};
///
/// // SpinLock is the default, so these are the same type.
/// let pool: FixedPool<u64, SpinLock> = FixedPool::with_capacity(8).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

// SAFETY: The swap only succeeds for one thread at a time until the flag is cleared again, which
// happens in unlock() with Release ordering that the Acquire swap synchronizes with.
unsafe impl RawLock for SpinLock {
    #[inline]
    fn lock(&self) {
        // Acquire synchronizes with the Release in unlock(), making all writes of the previous
        // holder visible to us.
        while self.locked.swap(true, Ordering::Acquire) {
            hint::spin_loop();
        }
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

/// A lock that parks waiting threads instead of spinning.
///
/// # Examples
///
/// ```
/// use fixed_pool::{BlockingLock, FixedPool};
///
/// let pool = FixedPool::<u64>::builder()
///     .lock::<BlockingLock>()
///     .initial_capacity(8)
///     .build()
///     .unwrap();
/// ```
pub struct BlockingLock {
    inner: parking_lot::RawMutex,
}

impl Default for BlockingLock {
    fn default() -> Self {
        Self {
            inner: parking_lot::RawMutex::INIT,
        }
    }
}

// SAFETY: Forwards to a parking_lot mutex, which provides mutual exclusion with acquire/release
// semantics as required by the lock_api contract.
unsafe impl RawLock for BlockingLock {
    #[inline]
    fn lock(&self) {
        self.inner.lock();
    }

    #[inline]
    unsafe fn unlock(&self) {
        // SAFETY: Forwarding guarantees from the caller - we hold the lock.
        unsafe {
            self.inner.unlock();
        }
    }
}

impl Debug for BlockingLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingLock")
            .field("locked", &self.inner.is_locked())
            .finish()
    }
}

/// Holds a [`RawLock`] for as long as the guard is alive.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub(crate) struct LockGuard<'a, L: RawLock> {
    lock: &'a L,
}

impl<'a, L: RawLock> LockGuard<'a, L> {
    pub(crate) fn acquire(lock: &'a L) -> Self {
        lock.lock();

        Self { lock }
    }
}

impl<L: RawLock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        // SAFETY: The guard only exists while the lock is held by us.
        unsafe {
            self.lock.unlock();
        }
    }
}
