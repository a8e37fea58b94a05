//! ABI constants for type metadata and its descriptors.

pub use metawalk_core::WORD_SIZE;

/// Metadata kinds with this bit set are not heap objects.
pub const METADATA_KIND_IS_NON_HEAP: usize = 0x200;
/// Metadata kinds with this bit set are private to the runtime.
pub const METADATA_KIND_IS_RUNTIME_PRIVATE: usize = 0x100;
/// Metadata kinds with this bit set do not describe types.
pub const METADATA_KIND_IS_NON_TYPE: usize = 0x400;
/// Largest kind value that is not an isa pointer.
pub const LAST_ENUMERATED_METADATA_KIND: usize = 0x7FF;
/// Struct kind value emitted before the non-heap flag existed.
pub const LEGACY_STRUCT_METADATA_KIND: usize = 1;

/// Whether class metadata carries the Objective-C interop words
/// (two cache words and the `data` word) after the superclass link.
pub const OBJC_INTEROP: bool = cfg!(target_vendor = "apple");

/// Context descriptors, field descriptors and their records are 4-byte aligned.
pub const DESCRIPTOR_ALIGN: usize = 4;

/// `flags` + `parent`.
pub const CONTEXT_DESCRIPTOR_SIZE: usize = 8;
/// Context prefix + `name` + `access_function` + `fields`.
pub const TYPE_CONTEXT_DESCRIPTOR_SIZE: usize = 20;
/// Type context prefix + `num_fields` + `field_offset_vector_offset`.
pub const STRUCT_DESCRIPTOR_SIZE: usize = 28;
/// Type context prefix + `superclass_type` + five `u32` words.
pub const CLASS_DESCRIPTOR_SIZE: usize = 44;
/// `mangled_type_name` + `superclass` + `kind` + `field_record_size` + `num_fields`.
pub const FIELD_DESCRIPTOR_HEADER_SIZE: usize = 16;
/// `flags` + `mangled_type_name` + `field_name`.
pub const FIELD_RECORD_SIZE: usize = 12;

/// Byte offsets inside a context descriptor.
pub mod context {
    pub const FLAGS: usize = 0;
    pub const PARENT: usize = 4;
    pub const NAME: usize = 8;
    pub const ACCESS_FUNCTION: usize = 12;
    pub const FIELDS: usize = 16;
}

/// Byte offsets inside a struct descriptor.
pub mod struct_descriptor {
    pub const NUM_FIELDS: usize = 20;
    pub const FIELD_OFFSET_VECTOR_OFFSET: usize = 24;
}

/// Byte offsets inside a class descriptor.
pub mod class_descriptor {
    pub const SUPERCLASS_TYPE: usize = 20;
    pub const METADATA_NEGATIVE_SIZE_IN_WORDS: usize = 24;
    pub const METADATA_POSITIVE_SIZE_IN_WORDS: usize = 28;
    pub const NUM_IMMEDIATE_MEMBERS: usize = 32;
    pub const NUM_FIELDS: usize = 36;
    pub const FIELD_OFFSET_VECTOR_OFFSET: usize = 40;
}

/// Byte offsets inside a field descriptor header and its records.
pub mod field_descriptor {
    pub const MANGLED_TYPE_NAME: usize = 0;
    pub const SUPERCLASS: usize = 4;
    pub const KIND: usize = 8;
    pub const FIELD_RECORD_SIZE: usize = 10;
    pub const NUM_FIELDS: usize = 12;

    pub const RECORD_FLAGS: usize = 0;
    pub const RECORD_MANGLED_TYPE_NAME: usize = 4;
    pub const RECORD_FIELD_NAME: usize = 8;
}

/// Byte offsets inside struct metadata.
pub mod struct_metadata {
    use super::WORD_SIZE;

    pub const KIND: usize = 0;
    pub const DESCRIPTOR: usize = WORD_SIZE;
}

/// Byte offsets inside class metadata.
pub mod class_metadata {
    use super::{OBJC_INTEROP, WORD_SIZE};

    pub const KIND: usize = 0;
    pub const SUPERCLASS: usize = WORD_SIZE;
    /// Objective-C `data` word; only meaningful with interop.
    pub const DATA: usize = 4 * WORD_SIZE;
    /// First field after the pointer-sized prefix.
    pub const FLAGS: usize = if OBJC_INTEROP { 5 } else { 2 } * WORD_SIZE;
    pub const INSTANCE_ADDRESS_POINT: usize = FLAGS + 4;
    pub const INSTANCE_SIZE: usize = FLAGS + 8;
    pub const INSTANCE_ALIGNMENT_MASK: usize = FLAGS + 12;
    pub const CLASS_SIZE: usize = FLAGS + 16;
    pub const CLASS_ADDRESS_POINT: usize = FLAGS + 20;
    pub const DESCRIPTOR: usize = FLAGS + 24;
    pub const IVAR_DESTROYER: usize = DESCRIPTOR + WORD_SIZE;
    /// Size of the fixed class metadata prefix.
    pub const SIZE: usize = IVAR_DESTROYER + WORD_SIZE;

    /// Low bits of `data` marking a native (non-Objective-C) class.
    pub const IS_NATIVE_MASK: usize = 0b11;
}
