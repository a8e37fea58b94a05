//! Self-relative 32-bit pointers.
//!
//! Compiled descriptors must stay position independent, so instead of
//! absolute addresses they store a signed 32-bit offset measured from the
//! address of the offset field itself. An offset of `0` means "absent".

use std::ffi::CStr;
use std::fmt;
use std::marker::PhantomData;

use crate::invariants::{ensure_aligned, ensure_indirect_target, ensure_present};
use crate::{Addr, WORD_SIZE};

/// Whether a stored relative offset denotes "absent".
#[inline]
pub fn is_absent(offset: i32) -> bool {
    offset == 0
}

/// Resolve a stored offset against the address it was read from.
///
/// # Panics
/// Panics if `offset` is absent; check [`is_absent`] first.
#[inline]
pub fn resolve(anchor: usize, offset: i32) -> usize {
    assert!(
        !is_absent(offset),
        "relative offset at {anchor:#x} is absent (caller must check `is_absent` first)"
    );
    anchor.wrapping_add_signed(offset as isize)
}

/// Resolve a stored offset, or `None` when it is absent.
#[inline]
pub fn try_resolve(anchor: usize, offset: i32) -> Option<usize> {
    (!is_absent(offset)).then(|| resolve(anchor, offset))
}

/// A typed view that can be materialized from the address a relative
/// pointer resolves to.
pub trait Pointee<'a>: Sized {
    /// Alignment the target address must satisfy.
    const ALIGN: usize;

    /// Build the view.
    ///
    /// # Safety
    /// `addr` must be aligned to [`Self::ALIGN`] and point to a well-formed
    /// instance of the viewed layout that stays valid for `'a`.
    unsafe fn from_addr(addr: Addr<'a>) -> Self;
}

impl<'a> Pointee<'a> for Addr<'a> {
    const ALIGN: usize = 1;

    unsafe fn from_addr(addr: Addr<'a>) -> Self {
        addr
    }
}

impl<'a> Pointee<'a> for &'a CStr {
    const ALIGN: usize = 1;

    unsafe fn from_addr(addr: Addr<'a>) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { addr.c_str() }
    }
}

/// A direct self-relative reference to a `T`.
pub struct RelativeDirectPointer<'a, T> {
    anchor: Addr<'a>,
    offset: i32,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Pointee<'a>> RelativeDirectPointer<'a, T> {
    /// Read the offset stored at `anchor`.
    ///
    /// # Safety
    /// `anchor` must be 4-byte aligned and readable for 4 bytes. If the stored
    /// offset is non-zero, its target must satisfy [`Pointee::from_addr`].
    pub unsafe fn read(anchor: Addr<'a>) -> Self {
        // SAFETY: forwarded to the caller.
        let offset = unsafe { anchor.read::<i32>() };
        Self {
            anchor,
            offset,
            _marker: PhantomData,
        }
    }

    /// Address the offset was read from.
    pub fn anchor(&self) -> Addr<'a> {
        self.anchor
    }

    /// The raw stored offset.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn is_null(&self) -> bool {
        is_absent(self.offset)
    }

    /// Resolved target address.
    ///
    /// # Panics
    /// Panics if the pointer is null.
    pub fn target(&self) -> Addr<'a> {
        ensure_present(self.anchor, self.offset);
        self.anchor.byte_offset(self.offset as isize)
    }

    /// Materialize the target view.
    ///
    /// # Panics
    /// Panics if the pointer is null or the target is misaligned for `T`.
    pub fn get(&self) -> T {
        let target = self.target();
        ensure_aligned(target, T::ALIGN, std::any::type_name::<T>());
        // SAFETY: `read` established that a non-null offset targets a valid `T`.
        unsafe { T::from_addr(target) }
    }

    /// Materialize the target view, or `None` when the pointer is null.
    pub fn try_get(&self) -> Option<T> {
        (!self.is_null()).then(|| self.get())
    }
}

impl<T> Clone for RelativeDirectPointer<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RelativeDirectPointer<'_, T> {}

impl<T> fmt::Debug for RelativeDirectPointer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeDirectPointer")
            .field("anchor", &self.anchor)
            .field("offset", &self.offset)
            .finish()
    }
}

/// A self-relative reference that may go through one level of indirection.
///
/// When the low bit of the stored offset is set, the offset (with that bit
/// cleared) resolves to a pointer-sized slot holding the absolute address of
/// the target. Otherwise it resolves to the target directly.
pub struct RelativeIndirectablePointer<'a, T> {
    anchor: Addr<'a>,
    offset: i32,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Pointee<'a>> RelativeIndirectablePointer<'a, T> {
    /// Read the offset stored at `anchor`.
    ///
    /// # Safety
    /// `anchor` must be 4-byte aligned and readable for 4 bytes. If the stored
    /// offset is non-zero, an indirect slot must be a readable, word-aligned
    /// pointer, and the final target must satisfy [`Pointee::from_addr`].
    pub unsafe fn read(anchor: Addr<'a>) -> Self {
        // SAFETY: forwarded to the caller.
        let offset = unsafe { anchor.read::<i32>() };
        Self {
            anchor,
            offset,
            _marker: PhantomData,
        }
    }

    pub fn anchor(&self) -> Addr<'a> {
        self.anchor
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn is_null(&self) -> bool {
        is_absent(self.offset)
    }

    pub fn is_indirect(&self) -> bool {
        self.offset & 1 != 0
    }

    /// Resolved target address, following the indirection slot if any.
    ///
    /// # Panics
    /// Panics if the pointer is null or an indirection slot holds null.
    pub fn target(&self) -> Addr<'a> {
        ensure_present(self.anchor, self.offset);
        if !self.is_indirect() {
            return self.anchor.byte_offset(self.offset as isize);
        }
        let slot = self.anchor.byte_offset((self.offset & !1) as isize);
        ensure_aligned(slot, WORD_SIZE, "indirect pointer slot");
        // SAFETY: `read` established that the slot is a readable pointer.
        let target = unsafe { slot.read_addr_at(0) };
        ensure_indirect_target(slot, target)
    }

    /// Materialize the target view.
    ///
    /// # Panics
    /// Panics if the pointer is null, the slot is null, or the target is
    /// misaligned for `T`.
    pub fn get(&self) -> T {
        let target = self.target();
        ensure_aligned(target, T::ALIGN, std::any::type_name::<T>());
        // SAFETY: `read` established that a resolvable target is a valid `T`.
        unsafe { T::from_addr(target) }
    }

    pub fn try_get(&self) -> Option<T> {
        (!self.is_null()).then(|| self.get())
    }
}

impl<T> Clone for RelativeIndirectablePointer<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RelativeIndirectablePointer<'_, T> {}

impl<T> fmt::Debug for RelativeIndirectablePointer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeIndirectablePointer")
            .field("anchor", &self.anchor)
            .field("offset", &self.offset)
            .field("indirect", &(self.offset & 1 != 0))
            .finish()
    }
}
