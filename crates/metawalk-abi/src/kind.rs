//! Metadata kind decoding and struct/class classification.
//!
//! The first word of every type metadata record is its kind. Classes on
//! platforms with Objective-C interop store an isa pointer there instead, so
//! any value above [`LAST_ENUMERATED_METADATA_KIND`] also denotes a class.

use serde::Serialize;

use crate::constants::{
    LAST_ENUMERATED_METADATA_KIND, LEGACY_STRUCT_METADATA_KIND, METADATA_KIND_IS_NON_HEAP,
    METADATA_KIND_IS_NON_TYPE, METADATA_KIND_IS_RUNTIME_PRIVATE, WORD_SIZE,
};
use crate::error::check_aligned;
use crate::invariants::ensure_valid;
use crate::{MetadataError, TypeHandle};

/// Shape category of a reflectable type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Value aggregate, copied by value.
    Struct,
    /// Reference aggregate, shared through an identity-bearing allocation.
    Class,
}

impl TypeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Class => "class",
        }
    }
}

/// Decoded leading word of type metadata.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MetadataKind {
    Class,
    /// Struct kind as emitted by older compilers (raw `1`).
    LegacyStruct,
    Struct,
    Enum,
    Optional,
    ForeignClass,
    Opaque,
    Tuple,
    Function,
    Existential,
    Metatype,
    ObjCClassWrapper,
    ExistentialMetatype,
    HeapLocalVariable,
    HeapGenericLocalVariable,
    ErrorObject,
    /// An enumerated value this crate has no name for.
    Other(usize),
    /// Not an enumerated kind: an isa pointer, so the metadata is a class.
    IsaPointer(usize),
}

impl MetadataKind {
    pub fn from_raw(raw: usize) -> Self {
        const NON_HEAP: usize = METADATA_KIND_IS_NON_HEAP;
        const PRIVATE_NON_HEAP: usize = METADATA_KIND_IS_RUNTIME_PRIVATE | NON_HEAP;
        const NON_TYPE: usize = METADATA_KIND_IS_NON_TYPE;
        const PRIVATE_NON_TYPE: usize = METADATA_KIND_IS_RUNTIME_PRIVATE | NON_TYPE;

        match raw {
            0 => Self::Class,
            LEGACY_STRUCT_METADATA_KIND => Self::LegacyStruct,
            NON_HEAP => Self::Struct,
            r if r == NON_HEAP + 1 => Self::Enum,
            r if r == NON_HEAP + 2 => Self::Optional,
            r if r == NON_HEAP + 3 => Self::ForeignClass,
            PRIVATE_NON_HEAP => Self::Opaque,
            r if r == PRIVATE_NON_HEAP + 1 => Self::Tuple,
            r if r == PRIVATE_NON_HEAP + 2 => Self::Function,
            r if r == PRIVATE_NON_HEAP + 3 => Self::Existential,
            r if r == PRIVATE_NON_HEAP + 4 => Self::Metatype,
            r if r == PRIVATE_NON_HEAP + 5 => Self::ObjCClassWrapper,
            r if r == PRIVATE_NON_HEAP + 6 => Self::ExistentialMetatype,
            NON_TYPE => Self::HeapLocalVariable,
            PRIVATE_NON_TYPE => Self::HeapGenericLocalVariable,
            r if r == PRIVATE_NON_TYPE + 1 => Self::ErrorObject,
            r if r > LAST_ENUMERATED_METADATA_KIND => Self::IsaPointer(r),
            r => Self::Other(r),
        }
    }

    /// The reflectable shape, if this kind has one.
    pub fn type_kind(self) -> Option<TypeKind> {
        match self {
            Self::Struct | Self::LegacyStruct => Some(TypeKind::Struct),
            Self::Class | Self::IsaPointer(_) => Some(TypeKind::Class),
            _ => None,
        }
    }
}

/// Read the raw kind word of a handle.
pub(crate) fn read_kind_word(handle: TypeHandle<'_>) -> Result<usize, MetadataError> {
    check_aligned(handle.addr(), WORD_SIZE, "type metadata")?;
    // SAFETY: the handle contract makes the aligned first word readable.
    Ok(unsafe { handle.addr().read::<usize>() })
}

/// Check that a handle classifies as `expected`.
pub(crate) fn expect_kind(handle: TypeHandle<'_>, expected: TypeKind) -> Result<(), MetadataError> {
    if try_classify(handle)? == expected {
        Ok(())
    } else {
        Err(MetadataError::WrongKind {
            handle: handle.address(),
            expected: expected.name(),
        })
    }
}

/// Decode the kind word of a handle without classifying it.
pub fn metadata_kind(handle: TypeHandle<'_>) -> Result<MetadataKind, MetadataError> {
    read_kind_word(handle).map(MetadataKind::from_raw)
}

/// Classify a handle as struct or class.
pub fn try_classify(handle: TypeHandle<'_>) -> Result<TypeKind, MetadataError> {
    let raw = read_kind_word(handle)?;
    let kind = MetadataKind::from_raw(raw)
        .type_kind()
        .ok_or(MetadataError::UnsupportedKind {
            handle: handle.address(),
            raw,
        })?;
    tracing::trace!(?handle, raw, kind = kind.name(), "classified type metadata");
    Ok(kind)
}

/// Classify a handle as struct or class.
///
/// # Panics
/// Panics if the handle is neither; reflecting over any other kind of type is
/// a caller error.
pub fn classify(handle: TypeHandle<'_>) -> TypeKind {
    ensure_valid(try_classify(handle))
}
