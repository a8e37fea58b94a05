//! Borrowed addresses into immutable, externally owned memory.
//!
//! An [`Addr`] carries no length. Every read states its own size, and whoever
//! created the root address vouches (through [`Addr::from_ptr`]) that all
//! memory reachable from it stays mapped and unchanged for `'a`.

use std::ffi::CStr;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use bytemuck::AnyBitPattern;

use crate::invariants::ensure_non_null;

/// Size of a machine word in bytes.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// A non-null address readable for the lifetime `'a`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr<'a> {
    ptr: NonNull<u8>,
    _marker: PhantomData<&'a [u8]>,
}

// SAFETY: `Addr` only ever reads, and the memory behind it is immutable for `'a`.
unsafe impl Send for Addr<'_> {}
unsafe impl Sync for Addr<'_> {}

impl<'a> Addr<'a> {
    /// Wrap a raw pointer. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr`, and every address later derived from it by following the
    /// layout being interpreted, must stay valid for reads and must not be
    /// mutated for the whole of `'a`.
    pub unsafe fn from_ptr(ptr: *const u8) -> Option<Self> {
        NonNull::new(ptr.cast_mut()).map(|ptr| Self {
            ptr,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn as_ptr(self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Numeric value of the address.
    #[inline]
    pub fn address(self) -> usize {
        self.ptr.as_ptr() as usize
    }

    #[inline]
    pub fn is_aligned_to(self, align: usize) -> bool {
        self.address().is_multiple_of(align)
    }

    /// Address `delta` bytes away (either direction).
    ///
    /// Arithmetic wraps; the result is only meaningful when it stays inside the
    /// object the caller is walking.
    #[inline]
    pub fn byte_offset(self, delta: isize) -> Self {
        let ptr = self.ptr.as_ptr().wrapping_offset(delta);
        Self {
            ptr: ensure_non_null(ptr, self.address(), delta),
            _marker: PhantomData,
        }
    }

    /// Address `count` bytes forward.
    #[inline]
    pub fn byte_add(self, count: usize) -> Self {
        self.byte_offset(count as isize)
    }

    /// Read a `T` at this address.
    ///
    /// # Safety
    /// The address must be aligned for `T` and `size_of::<T>()` bytes must be
    /// readable.
    #[inline]
    pub unsafe fn read<T: AnyBitPattern>(self) -> T {
        debug_assert!(
            self.is_aligned_to(std::mem::align_of::<T>()),
            "misaligned read of {} at {self:?}",
            std::any::type_name::<T>()
        );
        // SAFETY: forwarded to the caller; `AnyBitPattern` makes every byte
        // pattern a valid `T`.
        unsafe { self.ptr.as_ptr().cast::<T>().read() }
    }

    /// Read a `T` located `offset` bytes past this address.
    ///
    /// # Safety
    /// Same as [`Addr::read`] for the derived address.
    #[inline]
    pub unsafe fn read_at<T: AnyBitPattern>(self, offset: usize) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.byte_add(offset).read() }
    }

    /// Read a pointer-sized word at `offset` and interpret it as an address.
    ///
    /// # Safety
    /// Same as [`Addr::read_at`]; a non-null stored pointer must satisfy the
    /// contract of [`Addr::from_ptr`] for `'a`.
    #[inline]
    pub unsafe fn read_addr_at(self, offset: usize) -> Option<Addr<'a>> {
        // SAFETY: forwarded to the caller.
        unsafe {
            let raw: usize = self.read_at(offset);
            Addr::from_ptr(raw as *const u8)
        }
    }

    /// Borrow `len` consecutive `T`s starting at this address.
    ///
    /// # Safety
    /// The address must be aligned for `T` and `len * size_of::<T>()` bytes
    /// must be readable for `'a`.
    #[inline]
    pub unsafe fn slice<T: AnyBitPattern>(self, len: usize) -> &'a [T] {
        debug_assert!(self.is_aligned_to(std::mem::align_of::<T>()));
        // SAFETY: forwarded to the caller.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<T>(), len) }
    }

    /// Borrow the NUL-terminated string starting at this address.
    ///
    /// # Safety
    /// The bytes up to and including a NUL terminator must be readable for `'a`.
    #[inline]
    pub unsafe fn c_str(self) -> &'a CStr {
        // SAFETY: forwarded to the caller.
        unsafe { CStr::from_ptr(self.ptr.as_ptr().cast()) }
    }
}

impl fmt::Debug for Addr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.address())
    }
}

impl fmt::LowerHex for Addr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.address(), f)
    }
}
