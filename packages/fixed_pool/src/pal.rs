//! Platform Abstraction Layer (PAL). All virtual memory operations go through here so that
//! tests can observe and manipulate them via mock platforms.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

#[cfg(all(unix, not(miri)))]
mod unix;
#[cfg(all(unix, not(miri)))]
pub(crate) use unix::*;

#[cfg(all(windows, not(miri)))]
mod windows;
#[cfg(all(windows, not(miri)))]
pub(crate) use windows::*;

// The fallback module is compiled in test mode on all platforms, under Miri, and as the primary
// implementation on unsupported platforms. On supported platforms in test mode, it must be
// accessed via the explicit path `fallback::` to avoid ambiguity with the real implementation.
#[cfg(any(test, miri, not(any(unix, windows))))]
pub(crate) mod fallback;

#[cfg(any(miri, not(any(unix, windows))))]
pub(crate) use fallback::*;

#[cfg(test)]
mod mocks;
#[cfg(test)]
pub(crate) use mocks::*;
