//! Conveniences derived from the core primitives: copies, zeroed blocks and string duplicates.

use std::ffi::{CStr, c_char};
use std::ptr::{self, NonNull};
use std::slice;

use crate::Origin;
use crate::heap::Heap;

/// The platform's wide character, as used by `wcslen()` and friends.
pub type WideChar = libc::wchar_t;

impl Heap {
    /// A new block holding a copy of `source`. An empty `source` still yields a unique block.
    pub(crate) fn duplicate(&self, source: &[u8], origin: &Origin) -> NonNull<u8> {
        let block = self.allocate(source.len(), origin);

        if !source.is_empty() {
            // SAFETY: The block is at least `source.len()` bytes and freshly allocated, so it
            // cannot overlap `source`.
            unsafe {
                ptr::copy_nonoverlapping(source.as_ptr(), block.as_ptr(), source.len());
            }
        }

        block
    }

    pub(crate) fn zero_allocate(&self, size: usize, origin: &Origin) -> NonNull<u8> {
        let block = self.allocate(size, origin);

        // SAFETY: The block is at least `size` bytes.
        unsafe { block.as_ptr().write_bytes(0, size) };

        block
    }

    pub(crate) fn duplicate_cstr(&self, source: &CStr, origin: &Origin) -> NonNull<c_char> {
        self.duplicate_str_n(source.to_bytes(), source.to_bytes().len(), origin)
    }

    /// The first `n` bytes of `source` followed by a NUL. Embedded NULs are copied as-is.
    ///
    /// # Panics
    ///
    /// If `n` is greater than `source.len()`.
    pub(crate) fn duplicate_str_n(
        &self,
        source: &[u8],
        n: usize,
        origin: &Origin,
    ) -> NonNull<c_char> {
        let source = prefix(source, n);

        // SAFETY: `u8` and `c_char` have the same size and every bit pattern is valid for both.
        let source = unsafe { slice::from_raw_parts(source.as_ptr().cast::<c_char>(), n) };

        self.duplicate_terminated(source, origin)
    }

    /// Duplicates `source` up to its first NUL, or all of it if it has none.
    pub(crate) fn duplicate_wstr(&self, source: &[WideChar], origin: &Origin) -> NonNull<WideChar> {
        self.duplicate_wstr_n(source, wide_len(source), origin)
    }

    /// # Panics
    ///
    /// If `n` is greater than `source.len()`.
    pub(crate) fn duplicate_wstr_n(
        &self,
        source: &[WideChar],
        n: usize,
        origin: &Origin,
    ) -> NonNull<WideChar> {
        self.duplicate_terminated(prefix(source, n), origin)
    }

    // Zero is the terminator for every character type we deal with, which is `T::default()`.
    //
    // Custom backends owe us no alignment, so the block is filled bytewise and the terminator is
    // written unaligned.
    fn duplicate_terminated<T>(&self, source: &[T], origin: &Origin) -> NonNull<T>
    where
        T: Copy + Default,
    {
        let bytes = size_of_val(source);

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "a slice spans at most isize::MAX bytes, so one more element cannot overflow"
        )]
        let size = bytes + size_of::<T>();

        let block = self.allocate(size, origin);

        // SAFETY: The block holds `bytes` plus one more `T` and is freshly allocated, so it cannot
        // overlap `source`. Both copies are untyped, so the block may have any alignment.
        unsafe {
            ptr::copy_nonoverlapping(source.as_ptr().cast::<u8>(), block.as_ptr(), bytes);
            block
                .as_ptr()
                .add(bytes)
                .cast::<T>()
                .write_unaligned(T::default());
        }

        block.cast::<T>()
    }
}

fn prefix<T>(source: &[T], n: usize) -> &[T] {
    let Some(prefix) = source.get(..n) else {
        panic!(
            "cannot duplicate {n} characters from a string of {} characters",
            source.len()
        );
    };

    prefix
}

/// Number of characters before the first NUL, or the slice length if there is none.
fn wide_len(source: &[WideChar]) -> usize {
    source
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(source.len())
}
