#![cfg_attr(coverage_nightly, coverage(off))]

use std::fmt::{self, Debug};
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::FakePlatform;
use crate::pal::{BuildTargetPlatform, Platform};

/// Enum to hide the real/fake choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Fake(Arc<FakePlatform>),
}

/// Static instance of the real platform for production use.
static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

impl PlatformFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn from_fake(fake: FakePlatform) -> Self {
        Self::Fake(Arc::new(fake))
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(test, mutants::skip)]
impl Platform for PlatformFacade {
    fn malloc(&self, size: usize) -> *mut u8 {
        match self {
            Self::Target(platform) => platform.malloc(size),
            #[cfg(test)]
            Self::Fake(fake) => fake.malloc(size),
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        match self {
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Target(platform) => unsafe { platform.realloc(ptr, size) },
            #[cfg(test)]
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Fake(fake) => unsafe { fake.realloc(ptr, size) },
        }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        match self {
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Target(platform) => unsafe { platform.free(ptr) },
            #[cfg(test)]
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Fake(fake) => unsafe { fake.free(ptr) },
        }
    }

    #[cfg(windows)]
    fn aligned_malloc(&self, size: usize, alignment: usize) -> *mut u8 {
        match self {
            Self::Target(platform) => platform.aligned_malloc(size, alignment),
            #[cfg(test)]
            Self::Fake(fake) => fake.aligned_malloc(size, alignment),
        }
    }

    #[cfg(windows)]
    unsafe fn aligned_realloc(&self, ptr: *mut u8, size: usize, alignment: usize) -> *mut u8 {
        match self {
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Target(platform) => unsafe { platform.aligned_realloc(ptr, size, alignment) },
            #[cfg(test)]
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Fake(fake) => unsafe { fake.aligned_realloc(ptr, size, alignment) },
        }
    }

    #[cfg(windows)]
    unsafe fn aligned_free(&self, ptr: *mut u8) {
        match self {
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Target(platform) => unsafe { platform.aligned_free(ptr) },
            #[cfg(test)]
            // SAFETY: Forwarding safety requirements to the caller.
            Self::Fake(fake) => unsafe { fake.aligned_free(ptr) },
        }
    }

    fn report_fatal(&self, message: &str) {
        match self {
            Self::Target(platform) => platform.report_fatal(message),
            #[cfg(test)]
            Self::Fake(fake) => fake.report_fatal(message),
        }
    }

    fn breakpoint(&self) {
        match self {
            Self::Target(platform) => platform.breakpoint(),
            #[cfg(test)]
            Self::Fake(fake) => fake.breakpoint(),
        }
    }

    fn abort(&self) -> ! {
        match self {
            Self::Target(platform) => platform.abort(),
            #[cfg(test)]
            Self::Fake(fake) => fake.abort(),
        }
    }
}

impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Fake(inner) => inner.fmt(f),
        }
    }
}
