#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Read-only reflection over compiler-emitted type metadata.
//!
//! Given a [`TypeHandle`], the walker decides whether the type is a struct or
//! a class ([`classify`]) and reads its stored fields straight from the
//! descriptors the compiler emitted alongside the program:
//!
//! - [`StructMetadata`]: field count and field offset vector
//! - [`ClassMetadata`]: ancestor chain; field layout is reported as unsupported
//! - [`FieldDescriptor`]: field names, encoded type names and flags
//! - [`ContextDescriptor`]: the module/type nesting chain behind qualified names
//!
//! Every view borrows the metadata; nothing is copied unless asked for
//! ([`TypeLayout`]). Malformed input is a contract violation: constructors
//! panic, and their `try_*` counterparts return a [`MetadataError`].
//!
//! [`image`] builds self-contained metadata for hosts and tests that need
//! handles without a foreign runtime.

pub mod class_metadata;
pub mod constants;
pub mod context;
mod dump;
mod error;
pub mod field_descriptor;
mod handle;
pub mod image;
mod invariants;
mod kind;
mod layout;
mod metadata;
pub mod struct_metadata;

#[cfg(test)]
mod class_metadata_tests;
#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod kind_tests;
#[cfg(test)]
mod layout_tests;

pub use class_metadata::{ClassDescriptor, ClassMetadata};
pub use context::{
    ContextDescriptor, ContextDescriptorFlags, ContextDescriptorKind, TypeContextDescriptor,
};
pub use dump::dump;
pub use error::MetadataError;
pub use field_descriptor::{
    FieldDescriptor, FieldDescriptorKind, FieldRecord, FieldRecordFlags, FieldRecords,
    enumerate_fields,
};
pub use handle::TypeHandle;
pub use kind::{MetadataKind, TypeKind, classify, metadata_kind, try_classify};
pub use layout::{FieldLayout, TypeLayout};
pub use metadata::TypeMetadata;
pub use metawalk_core::{Colors, MangledName};
pub use struct_metadata::{StructDescriptor, StructMetadata};
