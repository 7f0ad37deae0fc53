//! Fake platform implementation for testing.

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Mutex};

use crate::pal::abstractions::Platform;

/// Alignment of the blocks backing the fake heap; skews are applied on top of it.
const BASE_ALIGNMENT: usize = 64;

const ERR_FAKE_LOCK: &str = "FakePlatform state lock should not be poisoned";

#[derive(Debug)]
struct FakeBlock {
    base: *mut u8,
    layout: Layout,
    usable: usize,
}

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug, Default)]
struct FakePlatformState {
    skew: usize,
    failing: bool,
    blocks: HashMap<usize, FakeBlock>,
    malloc_calls: usize,
    realloc_calls: usize,
    free_calls: usize,
    breakpoints: usize,
    fatal_messages: Vec<String>,
}

/// Fake implementation of the platform abstraction for testing.
///
/// The raw heap hands out blocks whose address is `skew` bytes past a 64-byte boundary, which lets
/// tests drive the header-byte alignment logic through every possible misalignment. The skew can
/// be changed between calls to simulate a reallocation landing on a differently aligned address.
///
/// The crash path panics instead of aborting, so the fatal path can be asserted with
/// `#[should_panic]`. Multiple clones share the same state.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

// SAFETY: The raw block pointers are only touched under the mutex and point at memory owned by
// the fake heap itself.
unsafe impl Send for FakePlatformState {}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState::default())),
        }
    }

    /// Subsequent raw blocks start this many bytes past a 64-byte boundary.
    pub(crate) fn set_skew(&self, skew: usize) {
        assert!(skew < BASE_ALIGNMENT);
        self.state.lock().expect(ERR_FAKE_LOCK).skew = skew;
    }

    /// While failing, every raw allocation and reallocation returns null.
    pub(crate) fn set_failing(&self, failing: bool) {
        self.state.lock().expect(ERR_FAKE_LOCK).failing = failing;
    }

    pub(crate) fn live_blocks(&self) -> usize {
        self.state.lock().expect(ERR_FAKE_LOCK).blocks.len()
    }

    pub(crate) fn malloc_calls(&self) -> usize {
        self.state.lock().expect(ERR_FAKE_LOCK).malloc_calls
    }

    pub(crate) fn realloc_calls(&self) -> usize {
        self.state.lock().expect(ERR_FAKE_LOCK).realloc_calls
    }

    pub(crate) fn free_calls(&self) -> usize {
        self.state.lock().expect(ERR_FAKE_LOCK).free_calls
    }

    pub(crate) fn breakpoints(&self) -> usize {
        self.state.lock().expect(ERR_FAKE_LOCK).breakpoints
    }

    pub(crate) fn fatal_messages(&self) -> Vec<String> {
        self.state.lock().expect(ERR_FAKE_LOCK).fatal_messages.clone()
    }

    fn allocate_block(state: &mut FakePlatformState, size: usize, alignment: usize) -> *mut u8 {
        let skew = if alignment == BASE_ALIGNMENT { state.skew } else { 0 };
        let layout = Layout::from_size_align(size + skew + 1, alignment)
            .expect("test sizes are far below isize::MAX");

        // SAFETY: Layout has a non-zero size.
        let base = unsafe { alloc::alloc(layout) };
        assert!(!base.is_null(), "the test process itself ran out of memory");

        // SAFETY: skew < layout size.
        let ptr = unsafe { base.add(skew) };
        state.blocks.insert(
            ptr.addr(),
            FakeBlock {
                base,
                layout,
                usable: size,
            },
        );
        ptr
    }

    fn release_block(state: &mut FakePlatformState, ptr: *mut u8) -> FakeBlock {
        let block = state
            .blocks
            .remove(&ptr.addr())
            .expect("pointer was not allocated by the fake heap or was already freed");

        // SAFETY: Base and layout are exactly what alloc() was called with.
        unsafe { alloc::dealloc(block.base, block.layout) };
        block
    }

    fn reallocate_block(
        state: &mut FakePlatformState,
        ptr: *mut u8,
        size: usize,
        alignment: usize,
    ) -> *mut u8 {
        if ptr.is_null() {
            return Self::allocate_block(state, size, alignment);
        }

        let usable = state
            .blocks
            .get(&ptr.addr())
            .expect("pointer was not allocated by the fake heap or was already freed")
            .usable;

        // Always move, so the caller has to cope with a new address and a new misalignment.
        let new_ptr = Self::allocate_block(state, size, alignment);

        // SAFETY: Both blocks are live, distinct and at least min(usable, size) bytes long.
        unsafe { ptr::copy_nonoverlapping(ptr, new_ptr, usable.min(size)) };

        Self::release_block(state, ptr);
        new_ptr
    }
}

impl Platform for FakePlatform {
    fn malloc(&self, size: usize) -> *mut u8 {
        let mut state = self.state.lock().expect(ERR_FAKE_LOCK);
        state.malloc_calls += 1;

        if state.failing {
            return ptr::null_mut();
        }

        Self::allocate_block(&mut state, size, BASE_ALIGNMENT)
    }

    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        let mut state = self.state.lock().expect(ERR_FAKE_LOCK);
        state.realloc_calls += 1;

        if state.failing {
            return ptr::null_mut();
        }

        Self::reallocate_block(&mut state, ptr, size, BASE_ALIGNMENT)
    }

    unsafe fn free(&self, ptr: *mut u8) {
        let mut state = self.state.lock().expect(ERR_FAKE_LOCK);
        state.free_calls += 1;

        if !ptr.is_null() {
            Self::release_block(&mut state, ptr);
        }
    }

    #[cfg(windows)]
    fn aligned_malloc(&self, size: usize, alignment: usize) -> *mut u8 {
        let mut state = self.state.lock().expect(ERR_FAKE_LOCK);
        state.malloc_calls += 1;

        if state.failing {
            return ptr::null_mut();
        }

        Self::allocate_block(&mut state, size, alignment)
    }

    #[cfg(windows)]
    unsafe fn aligned_realloc(&self, ptr: *mut u8, size: usize, alignment: usize) -> *mut u8 {
        let mut state = self.state.lock().expect(ERR_FAKE_LOCK);
        state.realloc_calls += 1;

        if state.failing {
            return ptr::null_mut();
        }

        Self::reallocate_block(&mut state, ptr, size, alignment)
    }

    #[cfg(windows)]
    unsafe fn aligned_free(&self, ptr: *mut u8) {
        // SAFETY: Same heap, same requirements.
        unsafe { self.free(ptr) }
    }

    fn report_fatal(&self, message: &str) {
        self.state
            .lock()
            .expect(ERR_FAKE_LOCK)
            .fatal_messages
            .push(message.to_owned());
    }

    fn breakpoint(&self) {
        self.state.lock().expect(ERR_FAKE_LOCK).breakpoints += 1;
    }

    fn abort(&self) -> ! {
        let last_message = self
            .state
            .lock()
            .expect(ERR_FAKE_LOCK)
            .fatal_messages
            .last()
            .cloned()
            .unwrap_or_default();

        panic!("fake platform aborted: {last_message}");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    #[test]
    fn applies_skew_to_raw_blocks() {
        let platform = FakePlatform::new();

        for skew in [0, 1, 7, 31, 33, 63] {
            platform.set_skew(skew);
            let block = platform.malloc(10);

            assert_eq!(block.addr() % BASE_ALIGNMENT, skew);

            // SAFETY: Block came from this fake heap.
            unsafe { platform.free(block) };
        }

        assert_eq!(platform.live_blocks(), 0);
    }

    #[test]
    fn realloc_moves_and_preserves_contents() {
        let platform = FakePlatform::new();
        let block = platform.malloc(4);

        // SAFETY: We own 4 bytes at block.
        unsafe { ptr::copy_nonoverlapping([1_u8, 2, 3, 4].as_ptr(), block, 4) };

        platform.set_skew(5);

        // SAFETY: Block came from this fake heap.
        let moved = unsafe { platform.realloc(block, 100) };
        assert_ne!(moved, block);
        assert_eq!(moved.addr() % BASE_ALIGNMENT, 5);

        let mut contents = [0_u8; 4];
        // SAFETY: First 4 bytes were copied over by realloc.
        unsafe { ptr::copy_nonoverlapping(moved, contents.as_mut_ptr(), 4) };
        assert_eq!(contents, [1, 2, 3, 4]);

        // SAFETY: Block came from this fake heap.
        unsafe { platform.free(moved) };
        assert_eq!(platform.malloc_calls(), 1);
        assert_eq!(platform.realloc_calls(), 1);
        assert_eq!(platform.free_calls(), 1);
        assert_eq!(platform.live_blocks(), 0);
    }

    #[test]
    fn failing_heap_returns_null() {
        let platform = FakePlatform::new();
        platform.set_failing(true);

        assert!(platform.malloc(1).is_null());

        // SAFETY: Null is always acceptable.
        assert!(unsafe { platform.realloc(ptr::null_mut(), 1) }.is_null());
        assert_eq!(platform.live_blocks(), 0);
    }

    #[test]
    fn crash_records_and_panics() {
        let platform = FakePlatform::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| platform.crash("boom")));

        assert!(result.is_err());
        assert_eq!(platform.breakpoints(), 1);
        assert_eq!(platform.fatal_messages(), vec!["boom".to_owned()]);
    }

    #[test]
    fn clones_share_state() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.set_failing(true);
        assert!(platform2.malloc(8).is_null());
        assert_eq!(platform1.malloc_calls(), 1);
    }
}
