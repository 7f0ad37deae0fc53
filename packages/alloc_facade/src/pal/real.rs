#[cfg(windows)]
use std::ffi::c_void;
use std::io::{self, Write};
use std::process;

use crate::pal::Platform;

#[cfg(windows)]
unsafe extern "C" {
    fn _aligned_malloc(size: usize, alignment: usize) -> *mut c_void;
    fn _aligned_realloc(ptr: *mut c_void, size: usize, alignment: usize) -> *mut c_void;
    fn _aligned_free(ptr: *mut c_void);
}

#[cfg(all(debug_assertions, windows))]
#[link(name = "kernel32")]
unsafe extern "system" {
    #[allow(non_snake_case, reason = "Win32 API name")]
    fn DebugBreak();
}

/// The C runtime heap and crash signaling of the platform that the build is targeting.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetPlatform;

// Real platform bindings are excluded from coverage measurement because:
// 1. They are exercised end to end by the integration tests.
// 2. The crash path terminates the process, so it cannot be observed in-process.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Platform for BuildTargetPlatform {
    fn malloc(&self, size: usize) -> *mut u8 {
        // SAFETY: No safety requirements; any size is acceptable and null signals failure.
        unsafe { libc::malloc(size) }.cast()
    }

    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { libc::realloc(ptr.cast(), size) }.cast()
    }

    unsafe fn free(&self, ptr: *mut u8) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { libc::free(ptr.cast()) }
    }

    #[cfg(windows)]
    fn aligned_malloc(&self, size: usize, alignment: usize) -> *mut u8 {
        // SAFETY: No safety requirements beyond a power-of-two alignment, which callers pass.
        unsafe { _aligned_malloc(size, alignment) }.cast()
    }

    #[cfg(windows)]
    unsafe fn aligned_realloc(&self, ptr: *mut u8, size: usize, alignment: usize) -> *mut u8 {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { _aligned_realloc(ptr.cast(), size, alignment) }.cast()
    }

    #[cfg(windows)]
    unsafe fn aligned_free(&self, ptr: *mut u8) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { _aligned_free(ptr.cast()) }
    }

    #[cfg_attr(test, mutants::skip)] // Output goes to the real stderr.
    fn report_fatal(&self, message: &str) {
        // Unbuffered and allocation-free: the heap may be exhausted at this point.
        let mut stderr = io::stderr().lock();
        _ = stderr.write_all(message.as_bytes());
        _ = stderr.write_all(b"\n");
    }

    #[cfg_attr(test, mutants::skip)] // Would stop the test process.
    fn breakpoint(&self) {
        #[cfg(all(debug_assertions, unix))]
        {
            // SAFETY: No safety requirements. Without a debugger attached the default
            // disposition terminates the process, which is where we are headed anyway.
            unsafe {
                libc::raise(libc::SIGTRAP);
            }
        }

        #[cfg(all(debug_assertions, windows))]
        {
            // SAFETY: No safety requirements. Without a debugger attached this raises a
            // breakpoint exception that terminates the process, as the abort would.
            unsafe {
                DebugBreak();
            }
        }
    }

    #[cfg_attr(test, mutants::skip)] // Would stop the test process.
    fn abort(&self) -> ! {
        process::abort()
    }
}
