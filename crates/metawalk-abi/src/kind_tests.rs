use crate::image::{ClassDef, FieldDef, ImageBuilder, StructDef};
use crate::{MetadataError, MetadataKind, TypeHandle, TypeKind, classify, metadata_kind, try_classify};

#[test]
fn decodes_enumerated_kinds() {
    assert_eq!(MetadataKind::from_raw(0), MetadataKind::Class);
    assert_eq!(MetadataKind::from_raw(1), MetadataKind::LegacyStruct);
    assert_eq!(MetadataKind::from_raw(0x200), MetadataKind::Struct);
    assert_eq!(MetadataKind::from_raw(0x201), MetadataKind::Enum);
    assert_eq!(MetadataKind::from_raw(0x202), MetadataKind::Optional);
    assert_eq!(MetadataKind::from_raw(0x301), MetadataKind::Tuple);
    assert_eq!(MetadataKind::from_raw(0x303), MetadataKind::Existential);
    assert_eq!(MetadataKind::from_raw(0x400), MetadataKind::HeapLocalVariable);
    assert_eq!(MetadataKind::from_raw(0x501), MetadataKind::ErrorObject);
    assert_eq!(MetadataKind::from_raw(0x7FF), MetadataKind::Other(0x7FF));
    assert_eq!(MetadataKind::from_raw(0x800), MetadataKind::IsaPointer(0x800));
}

#[test]
fn only_structs_and_classes_have_a_type_kind() {
    assert_eq!(MetadataKind::Struct.type_kind(), Some(TypeKind::Struct));
    assert_eq!(MetadataKind::LegacyStruct.type_kind(), Some(TypeKind::Struct));
    assert_eq!(MetadataKind::Class.type_kind(), Some(TypeKind::Class));
    assert_eq!(MetadataKind::IsaPointer(0x1_0000).type_kind(), Some(TypeKind::Class));
    assert_eq!(MetadataKind::Enum.type_kind(), None);
    assert_eq!(MetadataKind::Other(3).type_kind(), None);
}

#[test]
fn classifies_structs() {
    let mut builder = ImageBuilder::new();
    let point = builder.add_struct(StructDef::new("Point").field(FieldDef::new("x", "Si")));
    let legacy = builder.add_struct(StructDef::new("Legacy").raw_kind(1));
    let image = builder.finish();

    assert_eq!(classify(image.handle(point.metadata)), TypeKind::Struct);
    assert_eq!(classify(image.handle(legacy.metadata)), TypeKind::Struct);
    assert_eq!(
        metadata_kind(image.handle(legacy.metadata)),
        Ok(MetadataKind::LegacyStruct)
    );
}

#[test]
fn classifies_classes() {
    let mut builder = ImageBuilder::new();
    let base = builder.add_class(ClassDef::new("Base"));
    let isa = builder.add_class(ClassDef::new("Bridged").raw_kind(0x1_0000));
    let image = builder.finish();

    assert_eq!(classify(image.handle(base.metadata)), TypeKind::Class);
    assert_eq!(classify(image.handle(isa.metadata)), TypeKind::Class);
    assert_eq!(
        metadata_kind(image.handle(isa.metadata)),
        Ok(MetadataKind::IsaPointer(0x1_0000))
    );
}

#[test]
fn classification_is_repeatable() {
    let mut builder = ImageBuilder::new();
    let point = builder.add_struct(StructDef::new("Point"));
    let image = builder.finish();
    let handle = image.handle(point.metadata);

    assert_eq!(classify(handle), classify(handle));
}

#[test]
fn out_of_range_tag_is_reported() {
    let mut builder = ImageBuilder::new();
    let tuple = builder.add_struct(StructDef::new("Pair").raw_kind(0x301));
    let image = builder.finish();
    let handle = image.handle(tuple.metadata);

    assert_eq!(
        try_classify(handle),
        Err(MetadataError::UnsupportedKind {
            handle: handle.address(),
            raw: 0x301,
        })
    );
}

#[test]
#[should_panic(expected = "which is neither a struct nor a class")]
fn out_of_range_tag_panics() {
    let mut builder = ImageBuilder::new();
    let opaque = builder.add_struct(StructDef::new("Opaque").raw_kind(0x300));
    let image = builder.finish();

    classify(image.handle(opaque.metadata));
}

#[test]
fn misaligned_handle_is_reported() {
    let mut builder = ImageBuilder::new();
    let point = builder.add_struct(StructDef::new("Point"));
    let image = builder.finish();
    let aligned = image.handle(point.metadata);

    // SAFETY: only the alignment check runs; nothing is read.
    let handle = unsafe { TypeHandle::from_addr(aligned.addr().byte_add(2)) };

    assert!(matches!(
        try_classify(handle),
        Err(MetadataError::Misaligned { what: "type metadata", .. })
    ));
}

#[test]
fn handle_from_null_is_none() {
    // SAFETY: null is rejected before anything is read.
    assert!(unsafe { TypeHandle::from_ptr(std::ptr::null()) }.is_none());
}

#[test]
fn kind_names() {
    assert_eq!(TypeKind::Struct.name(), "struct");
    assert_eq!(TypeKind::Class.name(), "class");
}
