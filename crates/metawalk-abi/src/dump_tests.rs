use indoc::indoc;

use crate::image::{ClassDef, FieldDef, ImageBuilder, StructDef};
use crate::{Colors, FieldRecordFlags, TypeLayout, dump};

#[test]
fn dump_struct() {
    let mut builder = ImageBuilder::new();
    let module = builder.module("Shapes");
    let point = builder.add_struct(
        StructDef::new("Point3")
            .parent(module)
            .field(FieldDef::new("x", "Sd").flags(FieldRecordFlags::IS_VAR))
            .field(FieldDef::new("y", "Sd").flags(FieldRecordFlags::IS_VAR))
            .field(FieldDef::new("z", "Sd"))
            .offsets([0, 8, 16]),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(point.metadata)).unwrap();

    insta::assert_snapshot!(dump(&layout, Colors::OFF), @r"
    struct Shapes.Point3
      field_count = 3
      x  +0  Sd  [var]
      y  +8  Sd  [var]
      z +16  Sd
    ");
}

#[test]
fn dump_class() {
    let mut builder = ImageBuilder::new();
    let module = builder.module("Zoo");
    let animal = builder.add_class(ClassDef::new("Animal").parent(module));
    let dog = builder.add_class(
        ClassDef::new("Dog")
            .parent(module)
            .superclass(animal.metadata, "3Zoo6AnimalC")
            .field(FieldDef::new("name", "SS").flags(FieldRecordFlags::IS_VAR))
            .field(FieldDef::new("age", "Si").flags(0x10)),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(dog.metadata)).unwrap();

    insta::assert_snapshot!(dump(&layout, Colors::OFF), @r"
    class Zoo.Dog : Zoo.Animal
      field_count = unsupported
      name -  SS  [var]
      age  -  Si  [0x10]
    ");
}

#[test]
fn dump_untyped_fields_and_flag_sets() {
    let mut builder = ImageBuilder::new();
    let tagged = builder.add_struct(
        StructDef::new("Tagged")
            .field(FieldDef::untyped("tag"))
            .field(
                FieldDef::new("payload", "Si")
                    .flags(FieldRecordFlags::IS_VAR | FieldRecordFlags::IS_ARTIFICIAL | 0x20),
            ),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(tagged.metadata)).unwrap();

    insta::assert_snapshot!(dump(&layout, Colors::OFF), @r"
    struct Tagged
      field_count = 2
      tag     -
      payload -  Si  [var, artificial, 0x20]
    ");
}

#[test]
fn dump_with_colors() {
    let mut builder = ImageBuilder::new();
    let point = builder.add_struct(StructDef::new("Point").field(FieldDef::new("x", "Si")).offsets([0]));
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(point.metadata)).unwrap();
    let out = dump(&layout, Colors::ON);

    assert!(out.starts_with("\x1b[34mstruct Point\x1b[0m\n"));
    assert!(out.contains("\x1b[32mx\x1b[0m \x1b[2m+0\x1b[0m"));
}

#[test]
fn dump_without_field_descriptor() {
    let mut builder = ImageBuilder::new();
    let opaque = builder.add_struct(
        StructDef::new("Opaque")
            .field(FieldDef::new("raw", "Bo"))
            .without_field_descriptor(),
    );
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(opaque.metadata)).unwrap();

    assert_eq!(
        dump(&layout, Colors::OFF),
        indoc! {"
            struct Opaque
              field_count = 1
        "}
    );
}

#[test]
fn dump_class_without_descriptor() {
    let mut builder = ImageBuilder::new();
    let hidden = builder.add_class(ClassDef::new("Hidden").without_descriptor());
    let image = builder.finish();
    let layout = TypeLayout::of(image.handle(hidden.metadata)).unwrap();

    insta::assert_snapshot!(dump(&layout, Colors::OFF), @r"
    class <unnamed>
      field_count = unsupported
    ");
}
