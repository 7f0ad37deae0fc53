//! The aligned allocation strategy and the default backends built on top of it.

use std::ptr::{self, NonNull};

use crate::Backend;
use crate::constants::ALIGNMENT;
use crate::envelope::Envelope;
use crate::pal::{Platform, PlatformFacade};

/// Alignment that C `malloc()` guarantees on mainstream platforms: two machine words.
const PLATFORM_DEFAULT_ALIGNMENT: usize = 2 * size_of::<usize>();

/// How the default backend obtains aligned memory from the platform allocator.
///
/// All policies satisfy the same external contract; they only differ in how much work is needed
/// to get there and in the alignment they can promise.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum AlignmentPolicy {
    /// The platform has an aligned heap of its own (`_aligned_malloc` and friends); delegate to it.
    #[cfg(windows)]
    Native,

    /// Over-allocate from the plain C heap and store the distance to the aligned address in a
    /// header byte just in front of it.
    HeaderByte,

    /// Hand out whatever the plain C heap returns. Alignment is whatever `malloc()` guarantees.
    PassThrough,
}

impl AlignmentPolicy {
    /// The policy used by the facade's default backend on the build target.
    #[cfg(feature = "pass_through")]
    pub const BUILD_TARGET: Self = Self::PassThrough;

    /// The policy used by the facade's default backend on the build target.
    #[cfg(all(not(feature = "pass_through"), windows))]
    pub const BUILD_TARGET: Self = Self::Native;

    /// The policy used by the facade's default backend on the build target.
    #[cfg(all(not(feature = "pass_through"), not(windows)))]
    pub const BUILD_TARGET: Self = Self::HeaderByte;

    /// The boundary that every non-null pointer from this policy's backend is a multiple of.
    #[must_use]
    pub const fn alignment(self) -> usize {
        match self {
            #[cfg(windows)]
            Self::Native => ALIGNMENT,
            Self::HeaderByte => ALIGNMENT,
            Self::PassThrough => PLATFORM_DEFAULT_ALIGNMENT,
        }
    }

    /// The backend that implements this policy on top of the platform's C heap.
    ///
    /// Useful for hosts that install their own backend but still want to forward to the default
    /// behavior, for example to add instrumentation.
    #[must_use]
    pub const fn backend(self) -> Backend {
        match self {
            #[cfg(windows)]
            Self::Native => Backend::new(native::allocate, native::reallocate, native::free),
            Self::HeaderByte => Backend::new(
                header_byte::allocate,
                header_byte::reallocate,
                header_byte::free,
            ),
            Self::PassThrough => Backend::new(
                pass_through::allocate,
                pass_through::reallocate,
                pass_through::free,
            ),
        }
    }
}

/// One alignment policy bound to a platform heap.
#[derive(Debug)]
pub(crate) struct AlignedHeap {
    policy: AlignmentPolicy,
    platform: PlatformFacade,
}

impl AlignedHeap {
    pub(crate) const fn new(policy: AlignmentPolicy, platform: PlatformFacade) -> Self {
        Self { policy, platform }
    }

    /// Null if the platform heap is exhausted.
    pub(crate) fn allocate(&self, size: usize) -> *mut u8 {
        match self.policy {
            #[cfg(windows)]
            AlignmentPolicy::Native => self.platform.aligned_malloc(size, ALIGNMENT),
            AlignmentPolicy::HeaderByte => self.allocate_with_header(size),
            AlignmentPolicy::PassThrough => self.platform.malloc(size),
        }
    }

    /// Null if the platform heap is exhausted, in which case `ptr` remains valid.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this heap.
    pub(crate) unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        match self.policy {
            #[cfg(windows)]
            // SAFETY: Forwarding safety requirements to the caller.
            AlignmentPolicy::Native => unsafe {
                self.platform.aligned_realloc(ptr, size, ALIGNMENT)
            },
            // SAFETY: Forwarding safety requirements to the caller.
            AlignmentPolicy::HeaderByte => unsafe { self.reallocate_with_header(ptr, size) },
            // SAFETY: Forwarding safety requirements to the caller.
            AlignmentPolicy::PassThrough => unsafe { self.platform.realloc(ptr, size) },
        }
    }

    /// # Safety
    ///
    /// `ptr` must be null or a live block from this heap. It is dangling afterwards.
    pub(crate) unsafe fn free(&self, ptr: *mut u8) {
        match self.policy {
            #[cfg(windows)]
            // SAFETY: Forwarding safety requirements to the caller.
            AlignmentPolicy::Native => unsafe { self.platform.aligned_free(ptr) },
            // SAFETY: Forwarding safety requirements to the caller.
            AlignmentPolicy::HeaderByte => unsafe { self.free_with_header(ptr) },
            // SAFETY: Forwarding safety requirements to the caller.
            AlignmentPolicy::PassThrough => unsafe { self.platform.free(ptr) },
        }
    }

    fn allocate_with_header(&self, size: usize) -> *mut u8 {
        let Some(padded) = size.checked_add(ALIGNMENT) else {
            return ptr::null_mut();
        };

        let Some(raw) = NonNull::new(self.platform.malloc(padded)) else {
            return ptr::null_mut();
        };

        // SAFETY: The raw block is size + ALIGNMENT bytes long.
        let envelope = unsafe { Envelope::stamp(raw) };
        envelope.user().as_ptr()
    }

    unsafe fn reallocate_with_header(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        let Some(user) = NonNull::new(ptr) else {
            return self.allocate_with_header(size);
        };

        // SAFETY: Forwarding to the caller; `ptr` is a live block from this heap.
        let previous = unsafe { Envelope::recover(user) }
            .unwrap_or_else(|error| self.platform.crash(&error.to_string()));

        // Always ask for the full ALIGNMENT of padding, not just the previous offset: the block
        // may come back at an address that needs a larger offset than before.
        let Some(padded) = size.checked_add(ALIGNMENT) else {
            return ptr::null_mut();
        };

        // SAFETY: The raw pointer was recovered from a live block of this platform heap.
        let raw = unsafe { self.platform.realloc(previous.raw().as_ptr(), padded) };

        let Some(raw) = NonNull::new(raw) else {
            return ptr::null_mut();
        };

        // SAFETY: The raw block is size + ALIGNMENT bytes long and its leading bytes are a copy
        // of the previous block, so the payload sits at the previous offset.
        let envelope = unsafe { Envelope::restamp(raw, previous.offset(), size) };
        envelope.user().as_ptr()
    }

    unsafe fn free_with_header(&self, ptr: *mut u8) {
        let Some(user) = NonNull::new(ptr) else {
            return;
        };

        // SAFETY: Forwarding to the caller; `ptr` is a live block from this heap.
        let envelope = unsafe { Envelope::recover(user) }
            .unwrap_or_else(|error| self.platform.crash(&error.to_string()));

        // SAFETY: The raw pointer was recovered from a live block of this platform heap.
        unsafe { self.platform.free(envelope.raw().as_ptr()) };
    }
}

/// Generates the `extern "C"` trampolines that let an [`AlignedHeap`] static serve as a
/// [`Backend`].
macro_rules! backend_functions {
    ($module:ident, $heap:ident) => {
        mod $module {
            use std::ffi::c_void;

            use super::$heap;

            pub(super) unsafe extern "C" fn allocate(size: usize) -> *mut c_void {
                $heap.allocate(size).cast()
            }

            pub(super) unsafe extern "C" fn reallocate(
                ptr: *mut c_void,
                size: usize,
            ) -> *mut c_void {
                // SAFETY: The backend contract requires `ptr` to be null or from this backend.
                unsafe { $heap.reallocate(ptr.cast(), size) }.cast()
            }

            pub(super) unsafe extern "C" fn free(ptr: *mut c_void) {
                // SAFETY: The backend contract requires `ptr` to be null or from this backend.
                unsafe { $heap.free(ptr.cast()) }
            }
        }
    };
}

#[cfg(windows)]
static NATIVE_HEAP: AlignedHeap =
    AlignedHeap::new(AlignmentPolicy::Native, PlatformFacade::target());

static HEADER_BYTE_HEAP: AlignedHeap =
    AlignedHeap::new(AlignmentPolicy::HeaderByte, PlatformFacade::target());

static PASS_THROUGH_HEAP: AlignedHeap =
    AlignedHeap::new(AlignmentPolicy::PassThrough, PlatformFacade::target());

#[cfg(windows)]
backend_functions!(native, NATIVE_HEAP);
backend_functions!(header_byte, HEADER_BYTE_HEAP);
backend_functions!(pass_through, PASS_THROUGH_HEAP);
