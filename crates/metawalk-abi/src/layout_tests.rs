use crate::image::{ClassDef, FieldDef, ImageBuilder, StructDef};
use crate::{FieldRecordFlags, MetadataError, TypeKind, TypeLayout};

#[test]
fn struct_layout() {
    let mut builder = ImageBuilder::new();
    let module = builder.module("Shapes");
    let point = builder.add_struct(
        StructDef::new("Point")
            .parent(module)
            .field(FieldDef::new("x", "Si").flags(FieldRecordFlags::IS_VAR))
            .field(FieldDef::new("y", "Si"))
            .offsets([0, 8]),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(point.metadata)).unwrap();

    assert_eq!(layout.kind, TypeKind::Struct);
    assert_eq!(layout.field_count, Some(2));
    insta::assert_snapshot!(serde_json::to_string_pretty(&layout).unwrap(), @r#"
    {
      "kind": "struct",
      "name": "Point",
      "qualified_name": "Shapes.Point",
      "field_count": 2,
      "fields": [
        {
          "name": "x",
          "offset": 0,
          "mangled_type_name": "Si",
          "flags": 2
        },
        {
          "name": "y",
          "offset": 8,
          "mangled_type_name": "Si",
          "flags": 0
        }
      ]
    }
    "#);
}

#[test]
fn class_layout_has_names_but_no_offsets() {
    let mut builder = ImageBuilder::new();
    let module = builder.module("Zoo");
    let animal = builder.add_class(ClassDef::new("Animal").parent(module));
    let dog = builder.add_class(
        ClassDef::new("Dog")
            .parent(module)
            .superclass(animal.metadata, "3Zoo6AnimalC")
            .field(FieldDef::new("name", "SS").flags(FieldRecordFlags::IS_VAR)),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(dog.metadata)).unwrap();

    insta::assert_snapshot!(serde_json::to_string_pretty(&layout).unwrap(), @r#"
    {
      "kind": "class",
      "name": "Dog",
      "qualified_name": "Zoo.Dog",
      "field_count": null,
      "superclass": "Zoo.Animal",
      "fields": [
        {
          "name": "name",
          "offset": null,
          "mangled_type_name": "SS",
          "flags": 2
        }
      ]
    }
    "#);
}

#[test]
fn hidden_offsets_leave_fields_unplaced() {
    let mut builder = ImageBuilder::new();
    let hidden = builder.add_struct(
        StructDef::new("Hidden")
            .field(FieldDef::new("a", "Si"))
            .field(FieldDef::untyped("b")),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(hidden.metadata)).unwrap();

    assert_eq!(layout.field_count, Some(2));
    assert!(layout.fields.iter().all(|field| field.offset.is_none()));
    assert_eq!(layout.fields[1].mangled_type_name, None);
}

#[test]
fn unreflectable_handle_is_an_error() {
    let mut builder = ImageBuilder::new();
    let tuple = builder.add_struct(StructDef::new("Tuple").raw_kind(0x301));
    let image = builder.finish();
    let handle = image.handle(tuple.metadata);

    assert_eq!(
        TypeLayout::of(handle),
        Err(MetadataError::UnsupportedKind {
            handle: handle.address(),
            raw: 0x301,
        })
    );
}

#[test]
fn bad_record_size_is_an_error() {
    let mut builder = ImageBuilder::new();
    let shape = builder.add_struct(
        StructDef::new("S")
            .record_size(8)
            .field(FieldDef::new("a", "Si")),
    );
    let image = builder.finish();

    assert!(matches!(
        TypeLayout::of(image.handle(shape.metadata)),
        Err(MetadataError::InvalidFieldRecordSize { size: 8, .. })
    ));
}

#[test]
fn descriptorless_class_layout() {
    let mut builder = ImageBuilder::new();
    let hidden = builder.add_class(
        ClassDef::new("Hidden")
            .field(FieldDef::new("secret", "Si"))
            .without_descriptor(),
    );
    let leaf = builder.add_class(ClassDef::new("Leaf").superclass(hidden.metadata, "6Hidden"));
    let image = builder.finish();

    let hidden = TypeLayout::of(image.handle(hidden.metadata)).unwrap();
    assert_eq!(hidden.kind, TypeKind::Class);
    assert_eq!(hidden.name, None);
    assert_eq!(hidden.qualified_name, None);
    assert_eq!(hidden.field_count, None);
    assert!(hidden.fields.is_empty());

    let leaf = TypeLayout::of(image.handle(leaf.metadata)).unwrap();
    assert_eq!(leaf.name.as_deref(), Some("Leaf"));
    assert_eq!(leaf.superclass, None);
}
