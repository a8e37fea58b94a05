//! Owned summaries of a type's reflected layout.
//!
//! A [`TypeLayout`] copies what the views expose into plain data, so it can
//! outlive the handle, be dumped, or be serialized.

use serde::Serialize;

use crate::field_descriptor::{FieldRecord, FieldRecordFlags};
use crate::kind::TypeKind;
use crate::metadata::TypeMetadata;
use crate::{MetadataError, TypeHandle};

/// Reflected layout of a struct or class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeLayout {
    pub kind: TypeKind,
    /// Declared name; absent for classes without a descriptor.
    pub name: Option<String>,
    pub qualified_name: Option<String>,
    /// Stored field count; not reported for classes.
    pub field_count: Option<usize>,
    /// Qualified name of the nearest ancestor, for subclasses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub fields: Vec<FieldLayout>,
}

/// One reflected field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldLayout {
    pub name: String,
    /// Byte offset, when the type exposes a field offset vector.
    pub offset: Option<u32>,
    /// Encoded type name, with non-printable bytes escaped as `\xNN`.
    pub mangled_type_name: Option<String>,
    pub flags: FieldRecordFlags,
}

impl FieldLayout {
    fn new(record: FieldRecord<'_>, offset: Option<u32>) -> Self {
        Self {
            name: record.name_lossy().into_owned(),
            offset,
            mangled_type_name: record.mangled_type_name.map(|name| name.to_string()),
            flags: record.flags,
        }
    }
}

impl TypeLayout {
    /// Collect the layout of the type behind `handle`.
    pub fn of(handle: TypeHandle<'_>) -> Result<Self, MetadataError> {
        Self::from_metadata(TypeMetadata::try_new(handle)?)
    }

    /// Fails when the field descriptor or an ancestor's metadata is malformed.
    pub fn from_metadata(metadata: TypeMetadata<'_>) -> Result<Self, MetadataError> {
        let offsets = metadata.field_offsets().unwrap_or_default();
        let fields: Vec<FieldLayout> = metadata
            .try_fields()?
            .map(|descriptor| {
                descriptor
                    .records()
                    .enumerate()
                    .map(|(index, record)| FieldLayout::new(record, offsets.get(index).copied()))
                    .collect()
            })
            .unwrap_or_default();
        let superclass = match metadata.as_class() {
            Some(class) => class.try_superclass()?,
            None => None,
        }
        .and_then(|ancestor| ancestor.descriptor())
        .map(|descriptor| descriptor.qualified_name());

        Ok(Self {
            kind: metadata.kind(),
            name: metadata
                .name()
                .map(|name| name.to_string_lossy().into_owned()),
            qualified_name: metadata.qualified_name(),
            field_count: metadata.field_count().ok(),
            superclass,
            fields,
        })
    }
}
