//! Self-contained metadata images.
//!
//! An image owns a buffer of synthetic struct and class metadata laid out
//! exactly as a compiler would emit it. Because the image owns and never
//! mutates that memory after [`ImageBuilder::finish`], handing out
//! [`TypeHandle`]s into it is safe.

mod aligned_vec;
mod builder;


use std::fmt;

use metawalk_core::Addr;

pub use aligned_vec::ALIGN;
pub(crate) use aligned_vec::AlignedVec;
pub use builder::{ClassDef, FieldDef, ImageBuilder, StructDef, TypeSymbols};

use crate::TypeHandle;
use crate::context::ContextDescriptor;
use crate::invariants::{ensure_base, ensure_metadata, ensure_role, ensure_valid};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Role {
    Context,
    StructMetadata,
    ClassMetadata,
}

/// Location of an emitted context or metadata record inside one image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub(crate) image: u32,
    pub(crate) offset: usize,
    pub(crate) role: Role,
}

impl Symbol {
    /// Byte offset from the start of the image.
    pub fn offset(self) -> usize {
        self.offset
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?} @ {:#x})", self.role, self.offset)
    }
}

/// Finished image. Not `Clone`: absolute pointers inside refer to this
/// buffer.
#[derive(Debug)]
pub struct MetadataImage {
    id: u32,
    storage: AlignedVec,
}

impl MetadataImage {
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }

    /// Handle to the struct or class metadata at `symbol`.
    ///
    /// # Panics
    /// Panics if `symbol` is not metadata emitted into this image.
    pub fn handle(&self, symbol: Symbol) -> TypeHandle<'_> {
        ensure_metadata(symbol, self.id);
        // SAFETY: the builder emitted well-formed metadata at this offset, and
        // everything it references lives in the same immutable buffer.
        unsafe { TypeHandle::from_addr(self.addr_of(symbol)) }
    }

    /// The context descriptor at `symbol`.
    ///
    /// # Panics
    /// Panics if `symbol` is not a context emitted into this image.
    pub fn context(&self, symbol: Symbol) -> ContextDescriptor<'_> {
        ensure_role(symbol, self.id, Role::Context);
        // SAFETY: the builder emitted a well-formed context descriptor here.
        ensure_valid(unsafe { ContextDescriptor::from_addr(self.addr_of(symbol)) })
    }

    fn addr_of(&self, symbol: Symbol) -> Addr<'_> {
        // SAFETY: the storage is non-empty once a symbol exists in it, stays
        // put while `self` is borrowed, and is never written again.
        let base = unsafe { Addr::from_ptr(self.storage.as_ptr()) };
        ensure_base(base).byte_add(symbol.offset)
    }
}
