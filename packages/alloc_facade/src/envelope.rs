//! The header-byte alignment envelope.
//!
//! A raw block of `size + ALIGNMENT` bytes is carved up as follows:
//!
//! ```text
//! raw                          user = raw + offset
//! |<---------- offset ---------->|
//! [ padding ........... | offset ][ payload (size bytes) ........ ][ slack ]
//!                          ^ header byte
//! ```
//!
//! The offset is the minimal forward distance that makes `user` aligned, except that an already
//! aligned `raw` gets a full `ALIGNMENT` of padding so there is always room for the header byte.
//! Hence `1 <= offset <= ALIGNMENT`.

use std::ptr::{self, NonNull};

use crate::constants::ALIGNMENT;

/// Why a user pointer could not be mapped back to its raw block.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub(crate) enum EnvelopeError {
    #[error(
        "{address:#x} is not {}-byte aligned, so it was not issued by the aligned heap",
        ALIGNMENT
    )]
    Misaligned { address: usize },

    #[error(
        "header before {address:#x} holds offset {offset}, expected 1..={}; the heap is corrupted",
        ALIGNMENT
    )]
    CorruptOffset { address: usize, offset: u8 },
}

/// A raw backend block together with the offset of the aligned user pointer inside it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Envelope {
    raw: NonNull<u8>,
    offset: u8,
}

impl Envelope {
    /// The offset that aligns `raw`, in `1..=ALIGNMENT`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "ALIGNMENT fits in u8, checked at compile time"
    )]
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "misalignment < ALIGNMENT, so this cannot underflow"
    )]
    pub(crate) fn offset_for(raw: NonNull<u8>) -> u8 {
        let misalignment = raw.addr().get() & (ALIGNMENT - 1);
        (ALIGNMENT - misalignment) as u8
    }

    /// Places the header byte into a fresh raw block.
    ///
    /// # Safety
    ///
    /// `raw` must point to at least `ALIGNMENT` writable bytes.
    pub(crate) unsafe fn stamp(raw: NonNull<u8>) -> Self {
        let envelope = Self {
            raw,
            offset: Self::offset_for(raw),
        };

        // SAFETY: offset <= ALIGNMENT, so the header byte at user - 1 lies within the raw block.
        unsafe { envelope.header().write(envelope.offset) };

        envelope
    }

    /// Re-establishes the envelope after the backend resized (and possibly moved) the raw block.
    ///
    /// The payload sits `previous_offset` bytes into the new raw block, because the backend copies
    /// from the start of the block. If the new raw address needs a different offset, the payload is
    /// shifted into place before the header byte is rewritten.
    ///
    /// # Safety
    ///
    /// `raw` must point to at least `size + ALIGNMENT` writable bytes and `previous_offset` must be
    /// the offset of the block before it was resized.
    pub(crate) unsafe fn restamp(raw: NonNull<u8>, previous_offset: u8, size: usize) -> Self {
        let offset = Self::offset_for(raw);

        if offset != previous_offset {
            // SAFETY: Both offsets are <= ALIGNMENT and the block holds size + ALIGNMENT bytes, so
            // source and destination ranges are in bounds. They may overlap, hence copy().
            unsafe {
                ptr::copy(
                    raw.add(usize::from(previous_offset)).as_ptr(),
                    raw.add(usize::from(offset)).as_ptr(),
                    size,
                );
            }
        }

        let envelope = Self { raw, offset };

        // SAFETY: The header byte lies within the raw block, see stamp().
        unsafe { envelope.header().write(offset) };

        envelope
    }

    /// Reads the header byte in front of a user pointer to find the raw block.
    ///
    /// # Safety
    ///
    /// `user` must have been returned by [`user()`][Self::user] of a live envelope, or at least
    /// have one readable byte in front of it.
    pub(crate) unsafe fn recover(user: NonNull<u8>) -> Result<Self, EnvelopeError> {
        let address = user.addr().get();

        if address & (ALIGNMENT - 1) != 0 {
            return Err(EnvelopeError::Misaligned { address });
        }

        // SAFETY: Forwarding to the caller; the byte before `user` is readable.
        let offset = unsafe { user.sub(1).read() };

        if offset == 0 || usize::from(offset) > ALIGNMENT {
            return Err(EnvelopeError::CorruptOffset { address, offset });
        }

        Ok(Self {
            // SAFETY: The offset was written by stamp()/restamp() of the same block.
            raw: unsafe { user.sub(usize::from(offset)) },
            offset,
        })
    }

    pub(crate) const fn raw(&self) -> NonNull<u8> {
        self.raw
    }

    pub(crate) const fn offset(&self) -> u8 {
        self.offset
    }

    /// The aligned pointer handed out to callers.
    #[must_use]
    pub(crate) fn user(&self) -> NonNull<u8> {
        // SAFETY: The raw block spans at least `offset` bytes, guaranteed at construction.
        unsafe { self.raw.add(usize::from(self.offset)) }
    }

    fn header(&self) -> NonNull<u8> {
        // SAFETY: offset >= 1, so the header byte is inside the raw block.
        unsafe { self.user().sub(1) }
    }
}
