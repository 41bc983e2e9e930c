#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A thread-safe pool of fixed-size storage units, carved out of virtual memory pages obtained
//! directly from the operating system.
//!
//! This crate provides [`FixedPool`], an allocator for values of a single type `T` that
//! services repeated `malloc()`/`free()` requests by recycling units of storage instead of going
//! to the global allocator each time. It is meant for workloads that allocate and release large
//! numbers of same-sized objects from many threads.
//!
//! # Key Features
//!
//! - **Fixed-stride units**: Each unit is a small link header followed by storage for one `T`
//! - **LIFO recycling**: The most recently freed unit is handed out next, keeping caches warm
//! - **Direct page mapping**: Memory comes straight from the operating system in whole pages
//! - **Unconditional growth**: `malloc()` never fails while the operating system has memory
//! - **Pluggable locking**: [`SpinLock`] by default, [`BlockingLock`] for heavy contention
//! - **Configurable growth**: One unit at a time or geometric, see [`GrowthPolicy`]
//!
//! # Raw storage
//!
//! The pool is a raw storage allocator. It never constructs or drops values of type `T` - the
//! caller writes values into the storage and is responsible for dropping them before returning
//! the storage via `free()`. There is no compaction and no memory is returned to the operating
//! system until the pool itself is dropped.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//!
//! use fixed_pool::FixedPool;
//!
//! let pool = FixedPool::<u64>::with_capacity(128).unwrap();
//!
//! thread::scope(|s| {
//!     for t in 0..4 {
//!         let pool = &pool;
//!
//!         s.spawn(move || {
//!             let ptr = pool.malloc().unwrap();
//!
//!             // SAFETY: The storage is ours until we free it and is big enough for a u64.
//!             unsafe {
//!                 ptr.write(t);
//!                 assert_eq!(ptr.read(), t);
//!
//!                 pool.free(ptr);
//!             }
//!         });
//!     }
//! });
//!
//! let stats = pool.statistics();
//! assert_eq!(stats.allocated_units(), 0);
//! assert_eq!(stats.total_units(), 128);
//! ```

mod builder;
mod error;
mod growth_policy;
mod lock;
mod page_source;
mod pal;
mod pool;
mod stats;
mod unit;

pub use builder::*;
pub use error::{Error, Result};
pub use growth_policy::*;
pub use lock::{BlockingLock, RawLock, SpinLock};
pub(crate) use lock::LockGuard;
pub use page_source::PageSize;
pub(crate) use page_source::{PageRegion, PageSource};
pub use pool::FixedPool;
pub use stats::*;
pub use unit::UnitLayout;
pub(crate) use unit::FreeList;
