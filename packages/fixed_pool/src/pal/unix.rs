use std::io;
use std::ptr::{self, NonNull};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};

use crate::pal::Platform;

/// Virtual memory operations backed by `mmap()` and `munmap()`.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

// Real OS bindings are excluded from coverage measurement because:
// 1. They are tested via integration tests running on the real operating system.
// 2. Error paths require OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Platform for BuildTargetPlatform {
    fn page_size(&self) -> usize {
        // SAFETY: No safety requirements.
        let result = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

        assert!(result > 0, "{}", io::Error::last_os_error());

        usize::try_from(result).expect("positive c_long always fits in usize on unix targets")
    }

    fn map_pages(&self, len: usize) -> io::Result<NonNull<u8>> {
        // SAFETY: We request a fresh anonymous mapping at an address of the kernel's choosing,
        // so no existing memory is affected. No other safety requirements.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| io::Error::other("mmap() returned a null mapping"))
    }

    fn unmap_pages(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: The caller guarantees the region came from map_pages() with the same length
        // and that nobody will touch it after this call.
        let result = unsafe { libc::munmap(ptr.as_ptr().cast(), len) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
