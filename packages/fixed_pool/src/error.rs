use std::io;

use thiserror::Error;

/// Errors that can occur when creating or growing a [`FixedPool`][crate::FixedPool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operating system refused to provide the virtual memory needed to host more units.
    ///
    /// The pool remains usable after this error. Units that were already handed out stay valid
    /// and freeing units makes them available again without any new memory being requested.
    #[error("operating system refused to map {requested_bytes} bytes of memory: {source}")]
    ResourceExhaustion {
        /// Size of the mapping request that failed, already rounded up to whole pages.
        requested_bytes: usize,

        /// The error reported by the operating system.
        source: io::Error,
    },

    /// The number of bytes needed to host the requested number of units does not fit in the
    /// address space.
    #[error("memory size for {units} units overflows the address space")]
    CapacityOverflow {
        /// The number of units that was requested.
        units: usize,
    },

    /// The page size given to the pool builder is not usable.
    #[error("page size {page_size} is invalid: {problem}")]
    InvalidPageSize {
        /// The rejected page size.
        page_size: usize,

        /// A human-readable description of the problem.
        problem: &'static str,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
