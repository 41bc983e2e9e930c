use std::fmt::Debug;
use std::io;
use std::ptr::NonNull;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockPlatform;
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, Platform};

#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Platform for PlatformFacade {
    fn page_size(&self) -> usize {
        match self {
            Self::Target(p) => p.page_size(),
            #[cfg(test)]
            Self::Mock(p) => p.page_size(),
        }
    }

    fn map_pages(&self, len: usize) -> io::Result<NonNull<u8>> {
        match self {
            Self::Target(p) => p.map_pages(len),
            #[cfg(test)]
            Self::Mock(p) => p.map_pages(len),
        }
    }

    fn unmap_pages(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        match self {
            Self::Target(p) => p.unmap_pages(ptr, len),
            #[cfg(test)]
            Self::Mock(p) => p.unmap_pages(ptr, len),
        }
    }
}

impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(p) => p.fmt(f),
            #[cfg(test)]
            Self::Mock(p) => p.fmt(f),
        }
    }
}
