use std::io;
use std::ptr::NonNull;

use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE, VirtualAlloc, VirtualFree,
};
use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use crate::pal::Platform;

/// Virtual memory operations backed by `VirtualAlloc()` and `VirtualFree()`.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Platform for BuildTargetPlatform {
    fn page_size(&self) -> usize {
        let mut info = SYSTEM_INFO::default();

        // SAFETY: We pass a valid pointer to a writable SYSTEM_INFO. No other requirements.
        unsafe {
            GetSystemInfo(&raw mut info);
        }

        usize::try_from(info.dwPageSize).expect("u32 always fits in usize on Windows targets")
    }

    fn map_pages(&self, len: usize) -> io::Result<NonNull<u8>> {
        // SAFETY: We request a fresh committed region at an address of the operating system's
        // choosing, so no existing memory is affected. Committed pages are zero-initialized.
        let ptr = unsafe { VirtualAlloc(None, len, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };

        NonNull::new(ptr.cast::<u8>()).ok_or_else(io::Error::last_os_error)
    }

    fn unmap_pages(&self, ptr: NonNull<u8>, _len: usize) -> io::Result<()> {
        // SAFETY: The caller guarantees the region came from map_pages() and that nobody will
        // touch it after this call. MEM_RELEASE requires a size of zero.
        unsafe { VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE) }.map_err(io::Error::from)
    }
}
