use std::fmt;
use std::io;
use std::num::NonZero;
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::pal::{Platform, PlatformFacade};
use crate::{Error, Result};

/// The size of a virtual memory page, in bytes.
///
/// The page size is resolved once (typically at startup via [`PageSize::system()`]) and then
/// handed to each pool at construction time, so pools never consult global state when growing.
///
/// # Examples
///
/// ```
/// use fixed_pool::{FixedPool, PageSize};
///
/// let page_size = PageSize::system();
///
/// let pool = FixedPool::<u64>::builder()
///     .page_size(page_size)
///     .initial_capacity(16)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.page_size(), page_size);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PageSize(NonZero<usize>);

impl PageSize {
    /// Returns the page size of the operating system the process is running on.
    #[must_use]
    pub fn system() -> Self {
        Self::from_platform(&PlatformFacade::target())
    }

    /// Creates a page size from a byte count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPageSize`] if `bytes` is not a power of two.
    pub fn new(bytes: usize) -> Result<Self> {
        if !bytes.is_power_of_two() {
            return Err(Error::InvalidPageSize {
                page_size: bytes,
                problem: "page size must be a power of two",
            });
        }

        let bytes = NonZero::new(bytes).expect("powers of two are never zero");

        Ok(Self(bytes))
    }

    pub(crate) fn from_platform(platform: &PlatformFacade) -> Self {
        let bytes = platform.page_size();

        Self::new(bytes).expect("operating system reported a page size that is not a power of two")
    }

    /// The page size in bytes.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// A contiguous, page-aligned range of virtual memory obtained from the operating system.
///
/// The region does not release itself - it must be returned via [`PageSource::release()`].
#[derive(Debug)]
pub(crate) struct PageRegion {
    base: NonNull<u8>,
    page_count: usize,
    len: usize,
}

impl PageRegion {
    #[must_use]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[must_use]
    pub(crate) fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

/// Acquires and releases whole pages of virtual memory.
///
/// Requests are rounded up to a multiple of `page_size`, which may be larger than the page size
/// of the operating system. Page counts reported in regions are always operating system pages.
#[derive(Debug)]
pub(crate) struct PageSource {
    platform: PlatformFacade,
    page_size: PageSize,
    os_page_size: PageSize,
}

impl PageSource {
    /// `page_size` must be a multiple of the operating system page size.
    pub(crate) fn new(platform: PlatformFacade, page_size: PageSize) -> Self {
        let os_page_size = PageSize::from_platform(&platform);

        debug_assert!(
            page_size.get() >= os_page_size.get(),
            "page size {page_size} is not a multiple of the operating system page size {os_page_size}"
        );

        Self {
            platform,
            page_size,
            os_page_size,
        }
    }

    #[must_use]
    pub(crate) fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// The number of whole `page_size` pages needed to cover `byte_count` bytes. Never less
    /// than one.
    #[must_use]
    pub(crate) fn pages_for(&self, byte_count: usize) -> usize {
        byte_count.div_ceil(self.page_size.get()).max(1)
    }

    /// Maps enough whole pages to cover `byte_count` bytes as a single zero-filled region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhaustion`] if the operating system refuses the mapping. The
    /// request is not retried.
    pub(crate) fn acquire(&self, byte_count: usize) -> Result<PageRegion> {
        let len = self
            .pages_for(byte_count)
            .checked_mul(self.page_size.get())
            .ok_or_else(|| Error::ResourceExhaustion {
                requested_bytes: byte_count,
                source: io::Error::from(io::ErrorKind::OutOfMemory),
            })?;

        let base = self
            .platform
            .map_pages(len)
            .map_err(|source| Error::ResourceExhaustion {
                requested_bytes: len,
                source,
            })?;

        let page_count = len.div_ceil(self.os_page_size.get());

        // SAFETY: The platform just gave us `len` writable bytes starting at `base`.
        unsafe {
            ptr::write_bytes(base.as_ptr(), 0, len);
        }

        debug!(page_count, len, base = ?base, "acquired page region");

        Ok(PageRegion {
            base,
            page_count,
            len,
        })
    }

    /// Returns a region to the operating system.
    ///
    /// Any pointers into the region become dangling.
    pub(crate) fn release(&self, region: PageRegion) -> io::Result<()> {
        let PageRegion {
            base,
            page_count,
            len,
        } = region;

        self.platform.unmap_pages(base, len)?;

        debug!(page_count, len, base = ?base, "released page region");

        Ok(())
    }
}
