//! Installing a custom backend redirects every allocation through it.
//!
//! The backend is process-wide, so this binary contains a single test.

use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloc_facade::{AlignmentPolicy, Backend};

static ALLOCATE_CALLS: AtomicUsize = AtomicUsize::new(0);
static REALLOCATE_CALLS: AtomicUsize = AtomicUsize::new(0);
static FREE_CALLS: AtomicUsize = AtomicUsize::new(0);

// Counts calls and forwards to the default backend.
const DEFAULT: Backend = AlignmentPolicy::BUILD_TARGET.backend();

unsafe extern "C" fn counting_allocate(size: usize) -> *mut c_void {
    ALLOCATE_CALLS.fetch_add(1, Ordering::Relaxed);

    // SAFETY: Forwarding to the default backend under the same contract.
    unsafe { (DEFAULT.allocate_fn())(size) }
}

unsafe extern "C" fn counting_reallocate(ptr: *mut c_void, size: usize) -> *mut c_void {
    REALLOCATE_CALLS.fetch_add(1, Ordering::Relaxed);

    // SAFETY: Forwarding to the default backend under the same contract.
    unsafe { (DEFAULT.reallocate_fn())(ptr, size) }
}

unsafe extern "C" fn counting_free(ptr: *mut c_void) {
    FREE_CALLS.fetch_add(1, Ordering::Relaxed);

    // SAFETY: Forwarding to the default backend under the same contract.
    unsafe { (DEFAULT.free_fn())(ptr) }
}

#[test]
fn custom_backend_receives_every_call() {
    let counting = Backend::new(counting_allocate, counting_reallocate, counting_free);

    // Installed before any allocation in this process.
    alloc_facade::set_backend(&counting);

    let block = alloc_facade::allocate(10);
    assert_eq!(ALLOCATE_CALLS.load(Ordering::Relaxed), 1);

    // SAFETY: The block came from the facade and is not used afterwards.
    let block = unsafe { alloc_facade::reallocate(block.as_ptr(), 100) };
    assert_eq!(REALLOCATE_CALLS.load(Ordering::Relaxed), 1);

    // The derived helpers go through the same backend.
    let copy = alloc_facade::duplicate(b"abc");
    assert_eq!(ALLOCATE_CALLS.load(Ordering::Relaxed), 2);

    // SAFETY: The blocks came from the facade and are not used afterwards.
    unsafe {
        alloc_facade::free(block.as_ptr());
        alloc_facade::free(copy.as_ptr());
        alloc_facade::free(std::ptr::null_mut());
    }

    // Null never reaches the backend.
    assert_eq!(FREE_CALLS.load(Ordering::Relaxed), 2);
    assert_eq!(alloc_facade::live_allocations(), 0);

    // The installed backend can be read back and called directly.
    let active = alloc_facade::backend();
    // SAFETY: The counting backend upholds the backend contract.
    let raw = unsafe { (active.allocate_fn())(1) };
    assert_eq!(ALLOCATE_CALLS.load(Ordering::Relaxed), 3);
    // SAFETY: The block came from this backend and is not used afterwards.
    unsafe { (active.free_fn())(raw) };
}
