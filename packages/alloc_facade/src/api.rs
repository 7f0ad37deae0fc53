//! The public entry points. Each one forwards to the process-wide heap.

use std::ffi::{CStr, c_char};
use std::ptr::NonNull;

use crate::heap::HEAP;
use crate::{AlignmentPolicy, Backend, LeakReport, Origin, WideChar};

/// Allocates `size` bytes aligned to [`alignment()`].
///
/// A zero-byte request still returns a unique block that must be freed. The caller's source
/// location is recorded as the origin of the block. If the backend cannot satisfy the request,
/// the process is terminated.
///
/// # Examples
///
/// ```
/// let block = alloc_facade::allocate(64);
/// assert_eq!(block.addr().get() % alloc_facade::alignment(), 0);
///
/// // SAFETY: The block came from the facade and is not used afterwards.
/// unsafe { alloc_facade::free(block.as_ptr()) };
/// ```
#[must_use]
#[track_caller]
pub fn allocate(size: usize) -> NonNull<u8> {
    HEAP.allocate(size, &Origin::caller())
}

/// Allocates `size` bytes, recording `origin` as the reason for the allocation.
#[must_use]
pub fn allocate_with_origin(size: usize, origin: Origin) -> NonNull<u8> {
    HEAP.allocate(size, &origin)
}

/// Resizes a block, preserving its contents up to the smaller of the old and new sizes.
///
/// A null `ptr` allocates a new block. The result may be at a different address; the old address
/// must not be used afterwards. The process is terminated if the backend cannot satisfy the
/// request.
///
/// # Safety
///
/// `ptr` must be null or a live block returned by this crate under the currently installed
/// backend.
#[must_use]
#[track_caller]
pub unsafe fn reallocate(ptr: *mut u8, size: usize) -> NonNull<u8> {
    // SAFETY: Forwarding safety requirements to the caller.
    unsafe { HEAP.reallocate(ptr, size, &Origin::caller()) }
}

/// Like [`reallocate()`] but records `origin` as the reason for the resized block.
///
/// # Safety
///
/// `ptr` must be null or a live block returned by this crate under the currently installed
/// backend.
#[must_use]
pub unsafe fn reallocate_with_origin(ptr: *mut u8, size: usize, origin: Origin) -> NonNull<u8> {
    // SAFETY: Forwarding safety requirements to the caller.
    unsafe { HEAP.reallocate(ptr, size, &origin) }
}

/// Returns a block to the backend. A null `ptr` is ignored.
///
/// # Safety
///
/// `ptr` must be null or a live block returned by this crate under the currently installed
/// backend. It must not be used afterwards.
pub unsafe fn free(ptr: *mut u8) {
    // SAFETY: Forwarding safety requirements to the caller.
    unsafe { HEAP.free(ptr) }
}

/// A new block holding a copy of `source`.
///
/// An empty `source` still returns a unique block that must be freed.
#[must_use]
#[track_caller]
pub fn duplicate(source: &[u8]) -> NonNull<u8> {
    HEAP.duplicate(source, &Origin::caller())
}

/// Allocates `size` zero-filled bytes.
#[must_use]
#[track_caller]
pub fn zero_allocate(size: usize) -> NonNull<u8> {
    HEAP.zero_allocate(size, &Origin::caller())
}

/// A NUL-terminated copy of `source` in a new block. `None` in, `None` out.
///
/// # Examples
///
/// ```
/// let copy = alloc_facade::duplicate_cstr(Some(c"texture.png")).expect("input was Some");
///
/// // SAFETY: The copy is NUL-terminated.
/// assert_eq!(unsafe { std::ffi::CStr::from_ptr(copy.as_ptr()) }, c"texture.png");
///
/// // SAFETY: The block came from the facade and is not used afterwards.
/// unsafe { alloc_facade::free(copy.as_ptr().cast()) };
///
/// assert!(alloc_facade::duplicate_cstr(None).is_none());
/// ```
#[must_use]
#[track_caller]
pub fn duplicate_cstr(source: Option<&CStr>) -> Option<NonNull<c_char>> {
    let origin = Origin::caller();
    source.map(|source| HEAP.duplicate_cstr(source, &origin))
}

/// The first `n` bytes of `source` plus a NUL terminator in a new block. `None` in, `None` out.
///
/// Bytes are copied verbatim, including any NULs among them.
///
/// # Panics
///
/// If `n` is greater than the length of `source`.
#[must_use]
#[track_caller]
pub fn duplicate_str_n(source: Option<&[u8]>, n: usize) -> Option<NonNull<c_char>> {
    let origin = Origin::caller();
    source.map(|source| HEAP.duplicate_str_n(source, n, &origin))
}

/// A NUL-terminated copy of a wide string in a new block. `None` in, `None` out.
///
/// The string ends at its first NUL, or at the end of the slice if there is none. The result is
/// only aligned for [`WideChar`] if the installed backend aligns its blocks.
#[must_use]
#[track_caller]
pub fn duplicate_wstr(source: Option<&[WideChar]>) -> Option<NonNull<WideChar>> {
    let origin = Origin::caller();
    source.map(|source| HEAP.duplicate_wstr(source, &origin))
}

/// The first `n` characters of `source` plus a NUL terminator in a new block. `None` in, `None`
/// out.
///
/// # Panics
///
/// If `n` is greater than the length of `source`.
#[must_use]
#[track_caller]
pub fn duplicate_wstr_n(source: Option<&[WideChar]>, n: usize) -> Option<NonNull<WideChar>> {
    let origin = Origin::caller();
    source.map(|source| HEAP.duplicate_wstr_n(source, n, &origin))
}

/// Routes all further allocations through `candidate`.
///
/// The three functions are copied out of `candidate`; it does not need to outlive the call.
///
/// Blocks must be freed by the backend that allocated them, so install the backend at startup,
/// before any other thread allocates and before any block is handed out.
///
/// # Examples
///
/// ```
/// use alloc_facade::AlignmentPolicy;
///
/// // Reinstalls the default backend, which is always a valid choice.
/// alloc_facade::set_backend(&AlignmentPolicy::BUILD_TARGET.backend());
/// ```
pub fn set_backend(candidate: &Backend) {
    HEAP.set_backend(candidate);
}

/// A copy of the currently installed backend.
#[must_use]
pub fn backend() -> Backend {
    HEAP.backend()
}

/// The boundary that every block from the default backend is aligned to.
#[must_use]
pub const fn alignment() -> usize {
    AlignmentPolicy::BUILD_TARGET.alignment()
}

/// Number of blocks allocated and not yet freed, process-wide.
///
/// The count can go negative if blocks that were never allocated through this crate are freed
/// through it.
#[must_use]
pub fn live_allocations() -> isize {
    HEAP.live_allocations()
}

/// Empties the provenance ledger and reports every block still in it.
///
/// Each leak is also logged as a `tracing` warning. Blocks in the report are not freed and are
/// no longer tracked. Without the `provenance` feature the report is always empty.
#[must_use = "the report is also logged, but discarding it loses the addresses"]
pub fn report_leaks() -> LeakReport {
    HEAP.report_leaks()
}
