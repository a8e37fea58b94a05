//! Struct metadata and descriptors.

use std::ffi::CStr;

use crate::constants::{WORD_SIZE, struct_descriptor, struct_metadata};
use crate::context::{ContextDescriptor, ContextDescriptorKind, TypeContextDescriptor};
use crate::field_descriptor::FieldDescriptor;
use crate::invariants::ensure_valid;
use crate::kind::{TypeKind, expect_kind};
use crate::{MetadataError, TypeHandle};

/// View of a struct's nominal type descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StructDescriptor<'a> {
    ty: TypeContextDescriptor<'a>,
}

impl<'a> StructDescriptor<'a> {
    /// View `context` as a struct descriptor.
    pub fn from_context(context: ContextDescriptor<'a>) -> Result<Self, MetadataError> {
        TypeContextDescriptor::expecting(context, ContextDescriptorKind::Struct)
            .map(|ty| Self { ty })
    }

    pub fn type_context(self) -> TypeContextDescriptor<'a> {
        self.ty
    }

    pub fn name(self) -> &'a CStr {
        self.ty.name()
    }

    pub fn qualified_name(self) -> String {
        self.ty.qualified_name()
    }

    pub fn parent(self) -> Option<ContextDescriptor<'a>> {
        self.ty.parent()
    }

    pub fn fields(self) -> Option<FieldDescriptor<'a>> {
        self.ty.fields()
    }

    /// Number of stored properties.
    pub fn num_fields(self) -> usize {
        self.ty.word(struct_descriptor::NUM_FIELDS) as usize
    }

    /// Position of the field offset vector in words from the start of the
    /// metadata, or `0` when the metadata has none.
    pub fn field_offset_vector_offset(self) -> usize {
        self.ty.word(struct_descriptor::FIELD_OFFSET_VECTOR_OFFSET) as usize
    }

    pub fn has_field_offset_vector(self) -> bool {
        self.field_offset_vector_offset() != 0
    }
}

/// Runtime metadata of a struct.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StructMetadata<'a> {
    handle: TypeHandle<'a>,
    descriptor: StructDescriptor<'a>,
}

impl<'a> StructMetadata<'a> {
    /// # Panics
    /// Panics if `handle` is not well-formed struct metadata; see
    /// [`Self::try_new`] for the checks.
    pub fn new(handle: TypeHandle<'a>) -> Self {
        ensure_valid(Self::try_new(handle))
    }

    /// Validate `handle` as struct metadata: kind, word alignment, a present
    /// and aligned descriptor pointer, and a descriptor of struct kind.
    pub fn try_new(handle: TypeHandle<'a>) -> Result<Self, MetadataError> {
        expect_kind(handle, TypeKind::Struct)?;
        // SAFETY: struct metadata stores its descriptor pointer in word 1, and
        // the handle contract keeps what it points to valid for `'a`.
        let addr = unsafe { handle.addr().read_addr_at(struct_metadata::DESCRIPTOR) }.ok_or(
            MetadataError::NullDescriptor {
                handle: handle.address(),
            },
        )?;
        // SAFETY: a struct's descriptor pointer targets its context descriptor.
        let context = unsafe { ContextDescriptor::from_addr(addr) }?;
        let descriptor = StructDescriptor::from_context(context)?;
        tracing::trace!(?handle, descriptor = ?addr, "struct metadata");
        Ok(Self { handle, descriptor })
    }

    pub fn handle(self) -> TypeHandle<'a> {
        self.handle
    }

    pub fn descriptor(self) -> StructDescriptor<'a> {
        self.descriptor
    }

    pub fn name(self) -> &'a CStr {
        self.descriptor.name()
    }

    pub fn fields(self) -> Option<FieldDescriptor<'a>> {
        self.descriptor.fields()
    }

    pub fn try_fields(self) -> Result<Option<FieldDescriptor<'a>>, MetadataError> {
        self.descriptor.type_context().try_fields()
    }

    pub fn field_count(self) -> usize {
        self.descriptor.num_fields()
    }

    /// Byte offset of each stored property, in declaration order.
    ///
    /// Empty when the metadata carries no field offset vector, even if the
    /// struct has fields. Otherwise exactly [`Self::field_count`] entries.
    pub fn field_offsets(self) -> &'a [u32] {
        let locator = self.descriptor.field_offset_vector_offset();
        if locator == 0 {
            tracing::debug!(handle = ?self.handle, "struct has no field offset vector");
            return &[];
        }
        let start = self.handle.addr().byte_add(locator * WORD_SIZE);
        // SAFETY: a non-zero locator places `num_fields` u32 offsets at that
        // word of the metadata, which is word aligned.
        unsafe { start.slice::<u32>(self.field_count()) }
    }
}
