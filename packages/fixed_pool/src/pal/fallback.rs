use std::alloc::{self, Layout};
use std::io;
use std::ptr::NonNull;

use crate::pal::Platform;

/// The page size we pretend to have when there is no operating system to ask.
const FALLBACK_PAGE_SIZE: usize = 4096;

/// Fallback platform for targets without native virtual memory support and for Miri.
///
/// "Pages" are carved out of the Rust global allocator with page alignment, which is enough to
/// satisfy every guarantee the pool relies on (alignment, zero-initialization, stable address).
/// Unit tests also use this as the backing memory for mock platforms.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

impl BuildTargetPlatform {
    fn region_layout(len: usize) -> io::Result<Layout> {
        Layout::from_size_align(len, FALLBACK_PAGE_SIZE)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}

impl Platform for BuildTargetPlatform {
    fn page_size(&self) -> usize {
        FALLBACK_PAGE_SIZE
    }

    fn map_pages(&self, len: usize) -> io::Result<NonNull<u8>> {
        assert!(len > 0, "cannot map an empty region");

        let layout = Self::region_layout(len)?;

        // SAFETY: The layout has a nonzero size, as asserted above.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };

        NonNull::new(ptr).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
    }

    fn unmap_pages(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        let layout = Self::region_layout(len)?;

        // SAFETY: The caller guarantees the region came from map_pages() with the same length,
        // which means it was allocated with exactly this layout.
        unsafe {
            alloc::dealloc(ptr.as_ptr(), layout);
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn mapped_region_is_page_aligned_and_zeroed() {
        let platform = &BUILD_TARGET_PLATFORM;
        let len = platform.page_size() * 2;

        let ptr = platform.map_pages(len).unwrap();

        assert_eq!(ptr.as_ptr() as usize % platform.page_size(), 0);

        // SAFETY: The region is `len` bytes long and was just mapped for us.
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) };
        assert!(bytes.iter().all(|b| *b == 0));

        platform.unmap_pages(ptr, len).unwrap();
    }
}
