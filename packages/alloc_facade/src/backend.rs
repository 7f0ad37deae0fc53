use std::ffi::c_void;
use std::fmt;

/// Allocates `size` bytes, returning null if the request cannot be satisfied.
pub type AllocateFn = unsafe extern "C" fn(size: usize) -> *mut c_void;

/// Resizes the block at `ptr` (or allocates when `ptr` is null), returning null on failure.
///
/// On failure the original block must remain valid.
pub type ReallocateFn = unsafe extern "C" fn(ptr: *mut c_void, size: usize) -> *mut c_void;

/// Releases a block previously returned by the matching allocate/reallocate functions.
pub type FreeFn = unsafe extern "C" fn(ptr: *mut c_void);

/// The three capabilities that actually perform memory management for the facade.
///
/// The layout is `#[repr(C)]` so that a host written in any language with a C ABI can fill one in
/// and hand it to [`set_backend()`][crate::set_backend]. The facade copies the three function
/// pointers; it never takes ownership of whatever state the functions operate on.
///
/// # Contract for implementations
///
/// * `allocate` and `reallocate` return null to signal exhaustion. They never unwind.
/// * `reallocate(null, size)` behaves like `allocate(size)`.
/// * `free` accepts exactly the pointers returned by `allocate`/`reallocate` of the same backend.
///
/// Blocks need not be aligned. The facade never relies on it, but the pointers it returns are only
/// as aligned as the backend makes them, so a backend aligning to less than
/// [`alignment()`][crate::alignment] hands that weaker guarantee on to every caller.
///
/// # Examples
///
/// ```
/// use std::ffi::c_void;
///
/// use alloc_facade::Backend;
///
/// unsafe extern "C" fn allocate(size: usize) -> *mut c_void {
///     // SAFETY: Forwarding to the C allocator, which accepts any size.
///     unsafe { libc::malloc(size) }
/// }
///
/// unsafe extern "C" fn reallocate(ptr: *mut c_void, size: usize) -> *mut c_void {
///     // SAFETY: Caller passes a pointer obtained from this backend or null.
///     unsafe { libc::realloc(ptr, size) }
/// }
///
/// unsafe extern "C" fn free(ptr: *mut c_void) {
///     // SAFETY: Caller passes a pointer obtained from this backend or null.
///     unsafe { libc::free(ptr) }
/// }
///
/// // Install with `alloc_facade::set_backend()` at startup.
/// let backend = Backend::new(allocate, reallocate, free);
/// # drop(backend);
/// ```
#[derive(Clone, Copy)]
#[repr(C)]
pub struct Backend {
    allocate: AllocateFn,
    reallocate: ReallocateFn,
    free: FreeFn,
}

impl Backend {
    /// Bundles three capability functions into a backend.
    #[must_use]
    pub const fn new(allocate: AllocateFn, reallocate: ReallocateFn, free: FreeFn) -> Self {
        Self {
            allocate,
            reallocate,
            free,
        }
    }

    /// The allocate capability.
    #[must_use]
    pub const fn allocate_fn(&self) -> AllocateFn {
        self.allocate
    }

    /// The reallocate capability.
    #[must_use]
    pub const fn reallocate_fn(&self) -> ReallocateFn {
        self.reallocate
    }

    /// The free capability.
    #[must_use]
    pub const fn free_fn(&self) -> FreeFn {
        self.free
    }

    /// Requests `size` bytes from the backend. Null means the backend is exhausted.
    ///
    /// # Safety
    ///
    /// The backend functions must uphold the contract described on [`Backend`].
    #[inline]
    pub(crate) unsafe fn allocate(&self, size: usize) -> *mut u8 {
        // SAFETY: Forwarded to the caller.
        unsafe { (self.allocate)(size) }.cast()
    }

    /// # Safety
    ///
    /// `ptr` must be null or a live block obtained from this backend.
    #[inline]
    pub(crate) unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        // SAFETY: Forwarded to the caller.
        unsafe { (self.reallocate)(ptr.cast(), size) }.cast()
    }

    /// # Safety
    ///
    /// `ptr` must be a live block obtained from this backend. It is dangling afterwards.
    #[inline]
    pub(crate) unsafe fn free(&self, ptr: *mut u8) {
        // SAFETY: Forwarded to the caller.
        unsafe { (self.free)(ptr.cast()) }
    }
}

impl fmt::Debug for Backend {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("allocate", &(self.allocate as *const ()))
            .field("reallocate", &(self.reallocate as *const ()))
            .field("free", &(self.free as *const ()))
            .finish()
    }
}
