//! Context descriptors: the nesting chain that names every type.
//!
//! Each context descriptor starts with a flags word and a link to its parent
//! context. Module, protocol and type contexts follow that with a relative
//! pointer to their name. Struct and class descriptors extend the type
//! context prefix with their own fields.

use std::ffi::CStr;
use std::fmt;

use metawalk_core::{Addr, Pointee, RelativeDirectPointer, RelativeIndirectablePointer};

use crate::constants::{DESCRIPTOR_ALIGN, context};
use crate::error::check_aligned;
use crate::field_descriptor::FieldDescriptor;
use crate::invariants::ensure_valid;
use crate::MetadataError;

/// What a context descriptor describes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ContextDescriptorKind {
    Module,
    Extension,
    Anonymous,
    Protocol,
    OpaqueType,
    Class,
    Struct,
    Enum,
    Other(u8),
}

impl ContextDescriptorKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Module,
            1 => Self::Extension,
            2 => Self::Anonymous,
            3 => Self::Protocol,
            4 => Self::OpaqueType,
            16 => Self::Class,
            17 => Self::Struct,
            18 => Self::Enum,
            other => Self::Other(other),
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            Self::Module => 0,
            Self::Extension => 1,
            Self::Anonymous => 2,
            Self::Protocol => 3,
            Self::OpaqueType => 4,
            Self::Class => 16,
            Self::Struct => 17,
            Self::Enum => 18,
            Self::Other(raw) => raw,
        }
    }

    /// Kinds in the range reserved for nominal types.
    pub fn is_type(self) -> bool {
        (16..=31).contains(&self.to_raw())
    }

    /// Kinds whose descriptor stores a name right after the parent link.
    pub fn has_name(self) -> bool {
        matches!(self, Self::Module | Self::Protocol) || self.is_type()
    }
}

/// The flags word at the start of every context descriptor.
///
/// Bits 0-4 are the kind, bit 6 marks unique descriptors, bit 7 generic
/// contexts, bits 8-15 the format version, bits 16-31 kind-specific flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextDescriptorFlags(u32);

impl ContextDescriptorFlags {
    pub const IS_UNIQUE: u32 = 0x40;
    pub const IS_GENERIC: u32 = 0x80;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Flags for a descriptor of `kind` with no other bits set.
    pub fn for_kind(kind: ContextDescriptorKind) -> Self {
        Self(kind.to_raw() as u32 & 0x1F)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn kind(self) -> ContextDescriptorKind {
        ContextDescriptorKind::from_raw((self.0 & 0x1F) as u8)
    }

    pub fn is_unique(self) -> bool {
        self.0 & Self::IS_UNIQUE != 0
    }

    pub fn is_generic(self) -> bool {
        self.0 & Self::IS_GENERIC != 0
    }

    pub fn version(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn kind_specific_flags(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

impl fmt::Debug for ContextDescriptorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextDescriptorFlags")
            .field("kind", &self.kind())
            .field("unique", &self.is_unique())
            .field("generic", &self.is_generic())
            .field("version", &self.version())
            .field("kind_specific", &self.kind_specific_flags())
            .finish()
    }
}

/// View of any context descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextDescriptor<'a> {
    addr: Addr<'a>,
}

impl<'a> Pointee<'a> for ContextDescriptor<'a> {
    const ALIGN: usize = DESCRIPTOR_ALIGN;

    unsafe fn from_addr(addr: Addr<'a>) -> Self {
        Self { addr }
    }
}

impl<'a> ContextDescriptor<'a> {
    /// View the context descriptor at `addr`.
    ///
    /// # Safety
    /// `addr` must point to a well-formed context descriptor whose parent
    /// chain and names stay valid for `'a`.
    pub unsafe fn from_addr(addr: Addr<'a>) -> Result<Self, MetadataError> {
        check_aligned(addr, DESCRIPTOR_ALIGN, "context descriptor")?;
        Ok(Self { addr })
    }

    pub fn addr(self) -> Addr<'a> {
        self.addr
    }

    pub fn flags(self) -> ContextDescriptorFlags {
        // SAFETY: the flags word is part of every context descriptor.
        ContextDescriptorFlags(unsafe { self.addr.read_at::<u32>(context::FLAGS) })
    }

    pub fn kind(self) -> ContextDescriptorKind {
        self.flags().kind()
    }

    /// Enclosing context, or `None` at the top of the chain.
    pub fn parent(self) -> Option<ContextDescriptor<'a>> {
        // SAFETY: the parent link is part of every context descriptor, and a
        // present link targets another context descriptor.
        let link = unsafe {
            RelativeIndirectablePointer::<ContextDescriptor<'a>>::read(
                self.addr.byte_add(context::PARENT),
            )
        };
        link.try_get()
    }

    /// Name of a module, protocol or type context.
    pub fn name(self) -> Option<&'a CStr> {
        if !self.kind().has_name() {
            return None;
        }
        self.relative::<&'a CStr>(context::NAME).try_get()
    }

    /// This context viewed as a type context, if it is one.
    pub fn as_type(self) -> Option<TypeContextDescriptor<'a>> {
        self.kind()
            .is_type()
            .then_some(TypeContextDescriptor { context: self })
    }

    /// This context followed by each enclosing context, innermost first.
    pub fn ancestors(self) -> impl Iterator<Item = ContextDescriptor<'a>> + use<'a> {
        std::iter::successors(Some(self), |context| context.parent())
    }

    /// Dotted path of the named contexts enclosing and including this one,
    /// outermost first (e.g. `Module.Outer.Inner`). Unnamed contexts such as
    /// extensions are skipped.
    pub fn qualified_name(self) -> String {
        let mut names: Vec<_> = self.ancestors().filter_map(|context| context.name()).collect();
        names.reverse();
        names
            .iter()
            .map(|name| name.to_string_lossy())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Read a relative pointer stored `offset` bytes into this descriptor.
    pub(crate) fn relative<T: Pointee<'a>>(self, offset: usize) -> RelativeDirectPointer<'a, T> {
        // SAFETY: callers only pass offsets of relative pointer fields that
        // the descriptor's kind guarantees, and those target `T`.
        unsafe { RelativeDirectPointer::read(self.addr.byte_add(offset)) }
    }

    /// Read a `u32` stored `offset` bytes into this descriptor.
    pub(crate) fn word(self, offset: usize) -> u32 {
        // SAFETY: callers only pass offsets of fields the kind guarantees.
        unsafe { self.addr.read_at::<u32>(offset) }
    }
}

/// The prefix shared by struct, class and enum descriptors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeContextDescriptor<'a> {
    context: ContextDescriptor<'a>,
}

impl<'a> TypeContextDescriptor<'a> {
    /// View a context descriptor as a type context of `expected` kind.
    pub(crate) fn expecting(
        context: ContextDescriptor<'a>,
        expected: ContextDescriptorKind,
    ) -> Result<Self, MetadataError> {
        let found = context.kind();
        if found != expected {
            return Err(MetadataError::DescriptorKindMismatch {
                address: context.addr().address(),
                expected,
                found,
            });
        }
        Ok(Self { context })
    }

    pub fn context(self) -> ContextDescriptor<'a> {
        self.context
    }

    pub fn addr(self) -> Addr<'a> {
        self.context.addr()
    }

    pub fn flags(self) -> ContextDescriptorFlags {
        self.context.flags()
    }

    pub fn parent(self) -> Option<ContextDescriptor<'a>> {
        self.context.parent()
    }

    /// Declared name of the type, unqualified.
    ///
    /// # Panics
    /// Panics if the descriptor has no name, which well-formed type
    /// descriptors always do.
    pub fn name(self) -> &'a CStr {
        self.context.relative::<&'a CStr>(context::NAME).get()
    }

    pub fn qualified_name(self) -> String {
        self.context.qualified_name()
    }

    /// Address of the metadata access function, if one was emitted.
    pub fn access_function(self) -> Option<Addr<'a>> {
        self.context
            .relative::<Addr<'a>>(context::ACCESS_FUNCTION)
            .try_get()
    }

    /// The field descriptor, if the type has one.
    ///
    /// # Panics
    /// Panics if the field descriptor is malformed; see [`Self::try_fields`].
    pub fn fields(self) -> Option<FieldDescriptor<'a>> {
        ensure_valid(self.try_fields())
    }

    pub fn try_fields(self) -> Result<Option<FieldDescriptor<'a>>, MetadataError> {
        let link = self.context.relative::<Addr<'a>>(context::FIELDS);
        match link.try_get() {
            // SAFETY: a present `fields` link targets a field descriptor.
            Some(addr) => unsafe { FieldDescriptor::from_addr(addr) }.map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn relative<T: Pointee<'a>>(self, offset: usize) -> RelativeDirectPointer<'a, T> {
        self.context.relative(offset)
    }

    pub(crate) fn word(self, offset: usize) -> u32 {
        self.context.word(offset)
    }
}
