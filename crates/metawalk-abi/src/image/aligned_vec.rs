//! Word-aligned byte storage for metadata images.
//!
//! Views read words and pointers in place, so an image must start at a
//! boundary at least as strict as any field it holds. `Vec<u8>` gives no
//! alignment guarantee for `u8`.

use std::ops::Deref;

use crate::constants::WORD_SIZE;

/// Alignment of the first byte of every image.
pub const ALIGN: usize = 16;

const _: () = assert!(ALIGN >= WORD_SIZE);

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct Block([u8; ALIGN]);

/// Fixed-size, 16-byte aligned byte storage.
///
/// Backed by `Vec<Block>`: `Vec` aligns its elements, so the bytes start at a
/// 16-byte boundary and never move once copied in.
pub struct AlignedVec {
    blocks: Vec<Block>,
    len: usize,
}

impl AlignedVec {
    /// Copy bytes into aligned storage.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        let mut blocks = vec![Block([0; ALIGN]); bytes.len().div_ceil(ALIGN)];
        for (block, chunk) in blocks.iter_mut().zip(bytes.chunks(ALIGN)) {
            block.0[..chunk.len()].copy_from_slice(chunk);
        }
        Self {
            blocks,
            len: bytes.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.blocks.as_ptr().cast()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `Block` is `repr(C)` over `[u8; ALIGN]` and `len` never
        // exceeds the initialized blocks.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Overwrite the pointer-sized word at byte `at`.
    ///
    /// # Panics
    /// Panics if the word does not fit.
    pub(crate) fn write_word(&mut self, at: usize, value: usize) {
        let bytes = value.to_ne_bytes();
        self.as_mut_slice()[at..at + WORD_SIZE].copy_from_slice(&bytes);
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as in `as_slice`, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.blocks.as_mut_ptr().cast(), self.len) }
    }
}

impl Deref for AlignedVec {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for AlignedVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedVec")
            .field("len", &self.len)
            .field("aligned", &(self.as_ptr() as usize).is_multiple_of(ALIGN))
            .finish()
    }
}
