//! Platform abstraction trait definitions.

use std::fmt::Debug;

/// Raw heap and crash signaling capabilities of the platform.
///
/// The raw heap has no alignment guarantee beyond what the platform allocator provides by default.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Allocates `size` bytes from the raw heap. Null on exhaustion.
    fn malloc(&self, size: usize) -> *mut u8;

    /// Resizes a raw heap block, allocating when `ptr` is null. Null on exhaustion, in which case
    /// the original block is untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from [`malloc()`][Self::malloc]/`realloc()` of this
    /// platform.
    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8;

    /// Returns a block to the raw heap.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from [`malloc()`][Self::malloc]/`realloc()` of this
    /// platform.
    unsafe fn free(&self, ptr: *mut u8);

    /// Allocates `size` bytes aligned to `alignment` using the platform's native aligned heap.
    #[cfg(windows)]
    fn aligned_malloc(&self, size: usize, alignment: usize) -> *mut u8;

    /// # Safety
    ///
    /// `ptr` must be null or a live block from the native aligned heap of this platform.
    #[cfg(windows)]
    unsafe fn aligned_realloc(&self, ptr: *mut u8, size: usize, alignment: usize) -> *mut u8;

    /// # Safety
    ///
    /// `ptr` must be null or a live block from the native aligned heap of this platform.
    #[cfg(windows)]
    unsafe fn aligned_free(&self, ptr: *mut u8);

    /// Writes a fatal diagnostic where an operator will see it even if logging is not set up.
    fn report_fatal(&self, message: &str);

    /// Gives an attached debugger the chance to stop here. No-op in release builds.
    fn breakpoint(&self);

    /// Terminates the process without unwinding.
    fn abort(&self) -> !;

    /// The complete fatal path: report, break into the debugger, abort.
    fn crash(&self, message: &str) -> ! {
        self.report_fatal(message);
        self.breakpoint();
        self.abort()
    }
}
