//! Class metadata and descriptors.
//!
//! Only the ancestor chain and the fixed header words are interpreted. A
//! class's field offset vector may sit after its ancestors' members, so its
//! position depends on the whole chain; field layout is reported as
//! unsupported rather than guessed.

use std::ffi::CStr;

use metawalk_core::{MangledName, RelativeDirectPointer};

use crate::constants::{OBJC_INTEROP, class_descriptor, class_metadata};
use crate::context::{ContextDescriptor, ContextDescriptorKind, TypeContextDescriptor};
use crate::field_descriptor::FieldDescriptor;
use crate::invariants::ensure_valid;
use crate::kind::{TypeKind, expect_kind};
use crate::{MetadataError, TypeHandle};

/// View of a class's nominal type descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClassDescriptor<'a> {
    ty: TypeContextDescriptor<'a>,
}

impl<'a> ClassDescriptor<'a> {
    pub fn from_context(context: ContextDescriptor<'a>) -> Result<Self, MetadataError> {
        TypeContextDescriptor::expecting(context, ContextDescriptorKind::Class)
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

    /// Encoded name of the superclass type, if the class has one.
    pub fn superclass_type(self) -> Option<MangledName<'a>> {
        let link: RelativeDirectPointer<'a, MangledName<'a>> =
            self.ty.relative(class_descriptor::SUPERCLASS_TYPE);
        link.try_get()
    }

    /// Words of metadata before the address point.
    pub fn metadata_negative_size_in_words(self) -> u32 {
        self.ty.word(class_descriptor::METADATA_NEGATIVE_SIZE_IN_WORDS)
    }

    /// Words of metadata from the address point on.
    pub fn metadata_positive_size_in_words(self) -> u32 {
        self.ty.word(class_descriptor::METADATA_POSITIVE_SIZE_IN_WORDS)
    }

    /// Members this class adds to its metadata, excluding inherited ones.
    pub fn num_immediate_members(self) -> u32 {
        self.ty.word(class_descriptor::NUM_IMMEDIATE_MEMBERS)
    }
}

/// Runtime metadata of a class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClassMetadata<'a> {
    handle: TypeHandle<'a>,
    native: bool,
    descriptor: Option<ClassDescriptor<'a>>,
}

impl<'a> ClassMetadata<'a> {
    /// # Panics
    /// Panics if `handle` is not well-formed class metadata.
    pub fn new(handle: TypeHandle<'a>) -> Self {
        ensure_valid(Self::try_new(handle))
    }

    /// Validate `handle` as class metadata. A present descriptor must be of
    /// class kind; artificial subclasses and classes not defined natively
    /// have none.
    pub fn try_new(handle: TypeHandle<'a>) -> Result<Self, MetadataError> {
        expect_kind(handle, TypeKind::Class)?;
        let native = is_native(handle);
        // SAFETY: native class metadata stores its descriptor pointer at a
        // fixed word, and the handle contract keeps its target valid.
        let addr = native
            .then(|| unsafe { handle.addr().read_addr_at(class_metadata::DESCRIPTOR) })
            .flatten();
        let descriptor = match addr {
            Some(addr) => {
                // SAFETY: a class's descriptor pointer targets its context descriptor.
                let context = unsafe { ContextDescriptor::from_addr(addr) }?;
                Some(ClassDescriptor::from_context(context)?)
            }
            None => {
                tracing::debug!(?handle, native, "class metadata without a descriptor");
                None
            }
        };
        tracing::trace!(?handle, native, "class metadata");
        Ok(Self {
            handle,
            native,
            descriptor,
        })
    }

    pub fn handle(self) -> TypeHandle<'a> {
        self.handle
    }

    /// The nominal descriptor; `None` for artificial subclasses and classes
    /// not defined natively.
    pub fn descriptor(self) -> Option<ClassDescriptor<'a>> {
        self.descriptor
    }

    /// Whether the metadata carries the native class header. Always true
    /// without Objective-C interop.
    pub fn is_native(self) -> bool {
        self.native
    }

    pub fn name(self) -> Option<&'a CStr> {
        self.descriptor.map(ClassDescriptor::name)
    }

    /// # Panics
    /// Panics if the field descriptor is malformed; see [`Self::try_fields`].
    pub fn fields(self) -> Option<FieldDescriptor<'a>> {
        ensure_valid(self.try_fields())
    }

    pub fn try_fields(self) -> Result<Option<FieldDescriptor<'a>>, MetadataError> {
        match self.descriptor {
            Some(descriptor) => descriptor.type_context().try_fields(),
            None => Ok(None),
        }
    }

    /// Immediate ancestor, or `None` for a root class.
    ///
    /// # Panics
    /// Panics if the superclass link does not point to well-formed class
    /// metadata; see [`Self::try_superclass`].
    pub fn superclass(self) -> Option<ClassMetadata<'a>> {
        ensure_valid(self.try_superclass())
    }

    pub fn try_superclass(self) -> Result<Option<ClassMetadata<'a>>, MetadataError> {
        // SAFETY: the superclass word is part of every class metadata and a
        // non-null value points to the ancestor's metadata.
        let Some(addr) = (unsafe { self.handle.addr().read_addr_at(class_metadata::SUPERCLASS) })
        else {
            return Ok(None);
        };
        // SAFETY: as above.
        ClassMetadata::try_new(unsafe { TypeHandle::from_addr(addr) }).map(Some)
    }

    /// This class followed by each ancestor, nearest first.
    pub fn ancestors(self) -> impl Iterator<Item = ClassMetadata<'a>> + use<'a> {
        std::iter::successors(Some(self), |class| class.superclass())
    }

    /// Class flags word, for native classes.
    pub fn flags(self) -> Option<u32> {
        self.native_word(class_metadata::FLAGS)
    }

    pub fn instance_address_point(self) -> Option<u32> {
        self.native_word(class_metadata::INSTANCE_ADDRESS_POINT)
    }

    /// Size of an instance in bytes, for native classes.
    pub fn instance_size(self) -> Option<u32> {
        self.native_word(class_metadata::INSTANCE_SIZE)
    }

    pub fn instance_alignment_mask(self) -> Option<u16> {
        self.is_native().then(|| {
            // SAFETY: native class metadata carries the full fixed header.
            unsafe { self.handle.addr().read_at::<u16>(class_metadata::INSTANCE_ALIGNMENT_MASK) }
        })
    }

    /// Total size of the metadata object in bytes, for native classes.
    pub fn class_size(self) -> Option<u32> {
        self.native_word(class_metadata::CLASS_SIZE)
    }

    pub fn class_address_point(self) -> Option<u32> {
        self.native_word(class_metadata::CLASS_ADDRESS_POINT)
    }

    /// Not supported for classes.
    pub fn field_count(self) -> Result<usize, MetadataError> {
        Err(self.unsupported())
    }

    /// Not supported for classes.
    pub fn field_offsets(self) -> Result<&'a [u32], MetadataError> {
        Err(self.unsupported())
    }

    fn unsupported(self) -> MetadataError {
        MetadataError::ClassFieldLayoutUnsupported {
            handle: self.handle.address(),
        }
    }

    fn native_word(self, offset: usize) -> Option<u32> {
        self.is_native().then(|| {
            // SAFETY: native class metadata carries the full fixed header.
            unsafe { self.handle.addr().read_at::<u32>(offset) }
        })
    }
}

/// Whether the metadata at `handle` was defined natively rather than by the
/// Objective-C runtime. Without interop every class is native.
fn is_native(handle: TypeHandle<'_>) -> bool {
    if !OBJC_INTEROP {
        return true;
    }
    // SAFETY: with interop every class metadata carries the `data` word.
    let data = unsafe { handle.addr().read_at::<usize>(class_metadata::DATA) };
    data & class_metadata::IS_NATIVE_MASK != 0
}
