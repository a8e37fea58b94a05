//! Opaque type handles.

use std::fmt;

use metawalk_core::Addr;

/// Pointer-sized identifier of a type's runtime metadata.
///
/// The handle borrows the metadata for `'a`; nothing here owns or frees it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle<'a> {
    addr: Addr<'a>,
}

impl<'a> TypeHandle<'a> {
    /// Wrap a metadata pointer supplied by the host. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must point to fully initialized type metadata, and that metadata,
    /// its descriptors and everything they reference must stay loaded and
    /// unmodified for `'a`.
    pub unsafe fn from_ptr(ptr: *const ()) -> Option<Self> {
        // SAFETY: forwarded to the caller.
        unsafe { Addr::from_ptr(ptr.cast()) }.map(|addr| Self { addr })
    }

    /// # Safety
    /// Same contract as [`TypeHandle::from_ptr`], for the memory at `addr`.
    pub unsafe fn from_addr(addr: Addr<'a>) -> Self {
        Self { addr }
    }

    pub fn addr(self) -> Addr<'a> {
        self.addr
    }

    pub fn as_ptr(self) -> *const () {
        self.addr.as_ptr().cast()
    }

    pub fn address(self) -> usize {
        self.addr.address()
    }
}

impl fmt::Debug for TypeHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({:?})", self.addr)
    }
}
