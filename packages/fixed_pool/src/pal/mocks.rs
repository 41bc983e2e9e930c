#![cfg_attr(coverage_nightly, coverage(off))]

use std::io;
use std::ptr::NonNull;

use crate::pal::fallback::BUILD_TARGET_PLATFORM as FALLBACK;
use crate::pal::{MockPlatform, Platform};

/// Creates a mock platform that reports the fallback page size and releases regions back to
/// the fallback platform. Tests add their own `map_pages()` expectations, typically delegating
/// to [`map_via_fallback()`] so the pool receives real memory.
pub(crate) fn new_fallback_backed_mock() -> MockPlatform {
    let mut mock = MockPlatform::new();

    mock.expect_page_size().return_const(FALLBACK.page_size());
    mock.expect_unmap_pages()
        .returning(|ptr, len| FALLBACK.unmap_pages(ptr, len));

    mock
}

pub(crate) fn map_via_fallback(len: usize) -> io::Result<NonNull<u8>> {
    FALLBACK.map_pages(len)
}
