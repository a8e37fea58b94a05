use crate::constants::{OBJC_INTEROP, WORD_SIZE, class_metadata};
use crate::image::{ClassDef, FieldDef, ImageBuilder, StructDef};
use crate::{ClassMetadata, FieldDescriptorKind, MetadataError, TypeHandle, TypeKind, TypeMetadata};

#[repr(C, align(16))]
struct ZeroedClass([u8; class_metadata::SIZE]);

#[test]
fn descriptor_and_header_words() {
    let mut builder = ImageBuilder::new();
    let module = builder.module("Zoo");
    let animal = builder.add_class(
        ClassDef::new("Animal")
            .parent(module)
            .instance_size(32)
            .field(FieldDef::new("legs", "Si")),
    );
    let image = builder.finish();
    let class = ClassMetadata::new(image.handle(animal.metadata));

    let descriptor = class.descriptor().unwrap();
    assert!(class.is_native());
    assert_eq!(class.name(), Some(c"Animal"));
    assert_eq!(descriptor.qualified_name(), "Zoo.Animal");
    assert_eq!(descriptor.superclass_type(), None);
    assert_eq!(descriptor.metadata_negative_size_in_words(), 2);
    assert_eq!(
        descriptor.metadata_positive_size_in_words() as usize,
        class_metadata::SIZE / WORD_SIZE
    );
    assert_eq!(descriptor.num_immediate_members(), 0);
    assert_eq!(class.instance_size(), Some(32));
    assert_eq!(class.instance_alignment_mask(), Some((WORD_SIZE - 1) as u16));
    assert_eq!(class.class_address_point(), Some((2 * WORD_SIZE) as u32));
    assert_eq!(
        class.class_size(),
        Some((2 * WORD_SIZE + class_metadata::SIZE) as u32)
    );
    assert_eq!(class.flags(), Some(0));
}

#[test]
fn ancestor_chain() {
    let mut builder = ImageBuilder::new();
    let base = builder.add_class(ClassDef::new("Base"));
    let middle = builder.add_class(ClassDef::new("Middle").superclass(base.metadata, "4Zoo4BaseC"));
    let leaf = builder.add_class(ClassDef::new("Leaf").superclass(middle.metadata, "4Zoo6MiddleC"));
    let image = builder.finish();
    let leaf = ClassMetadata::new(image.handle(leaf.metadata));

    let names: Vec<_> = leaf.ancestors().map(|class| class.name().unwrap()).collect();
    assert_eq!(names, [c"Leaf", c"Middle", c"Base"]);

    let parent = leaf.superclass().unwrap();
    assert_eq!(parent.handle(), image.handle(middle.metadata));
    assert_eq!(
        leaf.descriptor().unwrap().superclass_type().unwrap().as_bytes(),
        b"4Zoo6MiddleC"
    );
    assert!(ClassMetadata::new(image.handle(base.metadata)).superclass().is_none());
}

#[test]
fn field_layout_is_unsupported() {
    let mut builder = ImageBuilder::new();
    let node = builder.add_class(
        ClassDef::new("Node")
            .field(FieldDef::new("value", "Si"))
            .field(FieldDef::new("next", "4List4NodeCSg")),
    );
    let image = builder.finish();
    let handle = image.handle(node.metadata);
    let class = ClassMetadata::new(handle);
    let unsupported = MetadataError::ClassFieldLayoutUnsupported {
        handle: handle.address(),
    };

    assert_eq!(class.field_count(), Err(unsupported.clone()));
    assert_eq!(class.field_offsets(), Err(unsupported.clone()));
    assert_eq!(TypeMetadata::new(handle).field_count(), Err(unsupported));
}

#[test]
fn class_fields_are_still_reflected() {
    let mut builder = ImageBuilder::new();
    let base = builder.add_class(ClassDef::new("Base"));
    let node = builder.add_class(
        ClassDef::new("Node")
            .superclass(base.metadata, "4List4BaseC")
            .field(FieldDef::new("value", "Si")),
    );
    let image = builder.finish();
    let fields = ClassMetadata::new(image.handle(node.metadata)).fields().unwrap();

    assert_eq!(fields.kind(), FieldDescriptorKind::Class);
    assert_eq!(fields.superclass().unwrap().as_bytes(), b"4List4BaseC");
    let names: Vec<_> = fields.records().map(|record| record.field_name).collect();
    assert_eq!(names, [c"value"]);
}

#[test]
fn struct_handle_is_the_wrong_kind() {
    let mut builder = ImageBuilder::new();
    let point = builder.add_struct(StructDef::new("Point"));
    let image = builder.finish();
    let handle = image.handle(point.metadata);

    assert_eq!(
        ClassMetadata::try_new(handle),
        Err(MetadataError::WrongKind {
            handle: handle.address(),
            expected: "class",
        })
    );
}

#[test]
#[should_panic(expected = "is not a class")]
fn struct_handle_panics() {
    let mut builder = ImageBuilder::new();
    let point = builder.add_struct(StructDef::new("Point"));
    let image = builder.finish();

    ClassMetadata::new(image.handle(point.metadata));
}

#[test]
fn type_metadata_dispatches_to_class() {
    let mut builder = ImageBuilder::new();
    let module = builder.module("Zoo");
    let cat = builder.add_class(ClassDef::new("Cat").parent(module));
    let image = builder.finish();
    let metadata = TypeMetadata::new(image.handle(cat.metadata));

    assert_eq!(metadata.kind(), TypeKind::Class);
    assert_eq!(metadata.qualified_name().as_deref(), Some("Zoo.Cat"));
    assert!(metadata.as_class().is_some());
    assert!(metadata.fields().is_some());
}

#[test]
fn zeroed_class_has_no_descriptor() {
    let storage = ZeroedClass([0; class_metadata::SIZE]);
    // SAFETY: `storage` is a zeroed class metadata prefix: kind 0, no
    // superclass, null descriptor.
    let handle = unsafe { TypeHandle::from_ptr(storage.0.as_ptr().cast()) }.unwrap();
    let class = ClassMetadata::try_new(handle).unwrap();

    assert_eq!(class.descriptor(), None);
    assert_eq!(class.name(), None);
    assert!(class.fields().is_none());
    assert!(class.superclass().is_none());
    assert_eq!(class.is_native(), !OBJC_INTEROP);
}

#[test]
fn artificial_subclass_has_no_descriptor() {
    let mut builder = ImageBuilder::new();
    let hidden = builder.add_class(
        ClassDef::new("Hidden")
            .instance_size(24)
            .field(FieldDef::new("secret", "Si"))
            .without_descriptor(),
    );
    let image = builder.finish();
    let class = ClassMetadata::new(image.handle(hidden.metadata));

    assert_eq!(class.descriptor(), None);
    assert_eq!(class.name(), None);
    assert_eq!(class.try_fields(), Ok(None));
    assert_eq!(class.is_native(), !OBJC_INTEROP);
    // Header words are only read from native metadata.
    let header = (!OBJC_INTEROP).then_some(24);
    assert_eq!(class.instance_size(), header);
    assert_eq!(class.class_size().is_some(), !OBJC_INTEROP);
    assert_eq!(TypeMetadata::new(image.handle(hidden.metadata)).qualified_name(), None);
}

#[test]
fn subclass_of_descriptorless_class() {
    let mut builder = ImageBuilder::new();
    let hidden = builder.add_class(ClassDef::new("Hidden").without_descriptor());
    let leaf = builder.add_class(ClassDef::new("Leaf").superclass(hidden.metadata, "6Hidden"));
    let image = builder.finish();
    let leaf = ClassMetadata::new(image.handle(leaf.metadata));

    let parent = leaf.try_superclass().unwrap().unwrap();
    assert_eq!(parent.handle(), image.handle(hidden.metadata));
    assert_eq!(parent.descriptor(), None);
    let names: Vec<_> = leaf.ancestors().map(|class| class.name()).collect();
    assert_eq!(names, [Some(c"Leaf"), None]);
}
