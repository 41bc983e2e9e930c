use std::fmt::Debug;
use std::io;
use std::ptr::NonNull;

/// Virtual memory operations of the operating system that the build is targeting.
///
/// All mappings are private, anonymous and read/write. Nothing we store in a pool is ever
/// executed, so no mapping ever requests execute permission.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// The size of a virtual memory page in bytes. Always a power of two.
    fn page_size(&self) -> usize;

    /// Maps `len` bytes of zero-initialized read/write memory.
    ///
    /// `len` is a nonzero multiple of the page size. The returned pointer is page-aligned.
    fn map_pages(&self, len: usize) -> io::Result<NonNull<u8>>;

    /// Unmaps a region previously returned by `map_pages()` with the same `len`.
    ///
    /// The caller must not access the region afterwards.
    fn unmap_pages(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()>;
}
