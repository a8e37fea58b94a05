//! Struct-or-class dispatch over a type handle.

use std::ffi::CStr;

use crate::class_metadata::ClassMetadata;
use crate::field_descriptor::FieldDescriptor;
use crate::invariants::ensure_valid;
use crate::kind::{TypeKind, try_classify};
use crate::struct_metadata::StructMetadata;
use crate::{MetadataError, TypeHandle};

/// Metadata of a reflectable type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeMetadata<'a> {
    Struct(StructMetadata<'a>),
    Class(ClassMetadata<'a>),
}

impl<'a> TypeMetadata<'a> {
    /// # Panics
    /// Panics if `handle` is neither struct nor class metadata, or is
    /// malformed.
    pub fn new(handle: TypeHandle<'a>) -> Self {
        ensure_valid(Self::try_new(handle))
    }

    pub fn try_new(handle: TypeHandle<'a>) -> Result<Self, MetadataError> {
        Ok(match try_classify(handle)? {
            TypeKind::Struct => Self::Struct(StructMetadata::try_new(handle)?),
            TypeKind::Class => Self::Class(ClassMetadata::try_new(handle)?),
        })
    }

    pub fn kind(self) -> TypeKind {
        match self {
            Self::Struct(_) => TypeKind::Struct,
            Self::Class(_) => TypeKind::Class,
        }
    }

    pub fn handle(self) -> TypeHandle<'a> {
        match self {
            Self::Struct(s) => s.handle(),
            Self::Class(c) => c.handle(),
        }
    }

    /// Declared name; `None` for classes without a descriptor.
    pub fn name(self) -> Option<&'a CStr> {
        match self {
            Self::Struct(s) => Some(s.name()),
            Self::Class(c) => c.name(),
        }
    }

    pub fn qualified_name(self) -> Option<String> {
        match self {
            Self::Struct(s) => Some(s.descriptor().qualified_name()),
            Self::Class(c) => c.descriptor().map(|d| d.qualified_name()),
        }
    }

    pub fn fields(self) -> Option<FieldDescriptor<'a>> {
        match self {
            Self::Struct(s) => s.fields(),
            Self::Class(c) => c.fields(),
        }
    }

    pub fn try_fields(self) -> Result<Option<FieldDescriptor<'a>>, MetadataError> {
        match self {
            Self::Struct(s) => s.try_fields(),
            Self::Class(c) => c.try_fields(),
        }
    }

    pub fn field_count(self) -> Result<usize, MetadataError> {
        match self {
            Self::Struct(s) => Ok(s.field_count()),
            Self::Class(c) => c.field_count(),
        }
    }

    pub fn field_offsets(self) -> Result<&'a [u32], MetadataError> {
        match self {
            Self::Struct(s) => Ok(s.field_offsets()),
            Self::Class(c) => c.field_offsets(),
        }
    }

    pub fn as_struct(self) -> Option<StructMetadata<'a>> {
        match self {
            Self::Struct(s) => Some(s),
            Self::Class(_) => None,
        }
    }

    pub fn as_class(self) -> Option<ClassMetadata<'a>> {
        match self {
            Self::Class(c) => Some(c),
            Self::Struct(_) => None,
        }
    }
}
