//! Lays out synthetic metadata in a single buffer.
//!
//! Relative pointers are position independent, so they are written as soon
//! as both ends are placed. Absolute pointers (metadata to descriptor,
//! subclass to superclass, indirect slots) depend on where the buffer ends
//! up; they are recorded as relocations and patched by [`ImageBuilder::finish`]
//! once the final storage exists.

use std::sync::atomic::{AtomicU32, Ordering};

use super::{AlignedVec, MetadataImage, Role, Symbol};
use crate::constants::{
    CLASS_DESCRIPTOR_SIZE, DESCRIPTOR_ALIGN, FIELD_DESCRIPTOR_HEADER_SIZE, FIELD_RECORD_SIZE,
    METADATA_KIND_IS_NON_HEAP, OBJC_INTEROP, STRUCT_DESCRIPTOR_SIZE, WORD_SIZE, class_descriptor,
    class_metadata, context, field_descriptor, struct_descriptor, struct_metadata,
};
use crate::context::{ContextDescriptorFlags, ContextDescriptorKind};
use crate::field_descriptor::FieldDescriptorKind;
use crate::invariants::{ensure_rel32, ensure_role, ensure_well_formed_mangled};
use crate::kind::{MetadataKind, TypeKind};

static NEXT_IMAGE: AtomicU32 = AtomicU32::new(0);

/// Words of class metadata before its address point.
const CLASS_NEGATIVE_WORDS: usize = 2;
/// `flags` + `parent` + `name`.
const MODULE_DESCRIPTOR_SIZE: usize = 12;
/// `flags` + `parent` + `extended_context`.
const EXTENSION_DESCRIPTOR_SIZE: usize = 12;

/// A stored property of a synthetic type.
#[derive(Clone, Debug)]
pub struct FieldDef {
    name: String,
    mangled_type_name: Option<Vec<u8>>,
    flags: u32,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, mangled_type_name: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            mangled_type_name: Some(mangled_type_name.as_ref().to_vec()),
            flags: 0,
        }
    }

    /// A field whose record has no type name.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mangled_type_name: None,
            flags: 0,
        }
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

#[derive(Clone, Copy, Debug)]
enum ParentLink {
    Direct(Symbol),
    Indirect(Symbol),
}

/// Settings shared by struct and class definitions.
#[derive(Clone, Debug)]
struct Nominal {
    name: String,
    parent: Option<ParentLink>,
    fields: Vec<FieldDef>,
    raw_kind: Option<usize>,
    record_size: u16,
    field_descriptor: bool,
    mangled_name: Option<Vec<u8>>,
}

impl Nominal {
    fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            fields: Vec::new(),
            raw_kind: None,
            record_size: FIELD_RECORD_SIZE as u16,
            field_descriptor: true,
            mangled_name: None,
        }
    }
}

macro_rules! nominal_setters {
    ($kind:expr) => {
        /// Enclosing context, linked directly.
        pub fn parent(mut self, context: Symbol) -> Self {
            self.nominal.parent = Some(ParentLink::Direct(context));
            self
        }

        /// Enclosing context, linked through an absolute pointer slot.
        pub fn indirect_parent(mut self, context: Symbol) -> Self {
            self.nominal.parent = Some(ParentLink::Indirect(context));
            self
        }

        pub fn field(mut self, field: FieldDef) -> Self {
            self.nominal.fields.push(field);
            self
        }

        /// Store `raw` as the metadata kind word instead of the default.
        ///
        /// # Panics
        /// Panics if `raw` classifies as the other aggregate kind, whose
        /// layout this definition does not emit.
        pub fn raw_kind(mut self, raw: usize) -> Self {
            let classified = MetadataKind::from_raw(raw).type_kind();
            assert!(
                classified.is_none() || classified == Some($kind),
                "kind word {raw:#x} does not describe a {}",
                $kind.name()
            );
            self.nominal.raw_kind = Some(raw);
            self
        }

        /// Declared size of each field record. Records are still laid out at
        /// least 12 bytes apart, so undersized declarations stay readable.
        pub fn record_size(mut self, size: u16) -> Self {
            self.nominal.record_size = size;
            self
        }

        /// Leave the descriptor's `fields` link absent.
        pub fn without_field_descriptor(mut self) -> Self {
            self.nominal.field_descriptor = false;
            self
        }

        /// Encoded name stored in the field descriptor header.
        pub fn mangled_name(mut self, bytes: impl AsRef<[u8]>) -> Self {
            self.nominal.mangled_name = Some(bytes.as_ref().to_vec());
            self
        }
    };
}

/// Definition of a synthetic struct.
#[derive(Clone, Debug)]
pub struct StructDef {
    nominal: Nominal,
    offsets: Option<Vec<u32>>,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nominal: Nominal::new(name.into()),
            offsets: None,
        }
    }

    nominal_setters!(TypeKind::Struct);

    /// Emit a field offset vector. Without one the descriptor's locator is 0.
    pub fn offsets(mut self, offsets: impl IntoIterator<Item = u32>) -> Self {
        self.offsets = Some(offsets.into_iter().collect());
        self
    }
}

/// Definition of a synthetic class.
#[derive(Clone, Debug)]
pub struct ClassDef {
    nominal: Nominal,
    superclass: Option<(Symbol, Vec<u8>)>,
    instance_size: u32,
    linked: bool,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nominal: Nominal::new(name.into()),
            superclass: None,
            instance_size: (2 * WORD_SIZE) as u32,
            linked: true,
        }
    }

    nominal_setters!(TypeKind::Class);

    /// Link to the superclass metadata, recording `mangled_type_name` as its
    /// encoded name.
    pub fn superclass(mut self, metadata: Symbol, mangled_type_name: impl AsRef<[u8]>) -> Self {
        self.superclass = Some((metadata, mangled_type_name.as_ref().to_vec()));
        self
    }

    pub fn instance_size(mut self, size: u32) -> Self {
        self.instance_size = size;
        self
    }

    /// Leave the metadata's descriptor word null, as for an artificial
    /// subclass. With Objective-C interop the `data` word is left without
    /// native bits too. The descriptor is still emitted.
    pub fn without_descriptor(mut self) -> Self {
        self.linked = false;
        self
    }
}

/// Where an emitted type landed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TypeSymbols {
    /// The type's metadata; pass to [`MetadataImage::handle`].
    pub metadata: Symbol,
    /// The type's descriptor, usable as a parent context.
    pub descriptor: Symbol,
}

#[derive(Clone, Copy, Debug)]
struct Relocation {
    at: usize,
    target: usize,
}

/// Incrementally emits contexts, types and their metadata.
#[derive(Debug)]
pub struct ImageBuilder {
    image: u32,
    bytes: Vec<u8>,
    relocations: Vec<Relocation>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            image: NEXT_IMAGE.fetch_add(1, Ordering::Relaxed),
            bytes: Vec::new(),
            relocations: Vec::new(),
        }
    }

    /// Emit a module context.
    pub fn module(&mut self, name: &str) -> Symbol {
        let at = self.reserve(DESCRIPTOR_ALIGN, MODULE_DESCRIPTOR_SIZE);
        self.put_flags(at, ContextDescriptorKind::Module);
        let name_at = self.push_bytes(name.as_bytes());
        self.put_rel(at + context::NAME, name_at);
        self.symbol(at, Role::Context)
    }

    /// Emit an unnamed extension context inside `parent`.
    pub fn extension(&mut self, parent: Symbol) -> Symbol {
        let at = self.reserve(DESCRIPTOR_ALIGN, EXTENSION_DESCRIPTOR_SIZE);
        self.put_flags(at, ContextDescriptorKind::Extension);
        self.put_parent(at, Some(ParentLink::Direct(parent)));
        self.symbol(at, Role::Context)
    }

    /// Emit a struct descriptor, its field descriptor and its metadata.
    ///
    /// # Panics
    /// Panics if an offset vector is given whose length differs from the
    /// number of fields.
    pub fn add_struct(&mut self, def: StructDef) -> TypeSymbols {
        let StructDef { nominal, offsets } = def;
        if let Some(offsets) = &offsets {
            assert_eq!(
                offsets.len(),
                nominal.fields.len(),
                "offset vector of `{}` must cover every field",
                nominal.name
            );
        }
        // The vector follows the kind and descriptor words.
        let locator = if offsets.is_some() { 2 } else { 0 };

        let descriptor = self.reserve(DESCRIPTOR_ALIGN, STRUCT_DESCRIPTOR_SIZE);
        self.put_type_context(descriptor, ContextDescriptorKind::Struct, &nominal);
        self.put_u32(
            descriptor + struct_descriptor::NUM_FIELDS,
            nominal.fields.len() as u32,
        );
        self.put_u32(
            descriptor + struct_descriptor::FIELD_OFFSET_VECTOR_OFFSET,
            locator,
        );
        self.put_fields(descriptor, FieldDescriptorKind::Struct, &nominal, None);

        let vector = offsets.unwrap_or_default();
        let words = locator as usize + (vector.len() * 4).div_ceil(WORD_SIZE);
        let metadata = self.reserve(WORD_SIZE, words.max(2) * WORD_SIZE);
        self.put_word(
            metadata + struct_metadata::KIND,
            nominal.raw_kind.unwrap_or(METADATA_KIND_IS_NON_HEAP),
        );
        self.put_abs(metadata + struct_metadata::DESCRIPTOR, descriptor);
        for (index, offset) in vector.iter().enumerate() {
            self.put_u32(metadata + locator as usize * WORD_SIZE + index * 4, *offset);
        }

        TypeSymbols {
            metadata: self.symbol(metadata, Role::StructMetadata),
            descriptor: self.symbol(descriptor, Role::Context),
        }
    }

    /// Emit a class descriptor, its field descriptor and its metadata.
    pub fn add_class(&mut self, def: ClassDef) -> TypeSymbols {
        let ClassDef {
            nominal,
            superclass,
            instance_size,
            linked,
        } = def;
        let superclass = superclass.map(|(symbol, name)| {
            (self.resolve(symbol, Role::ClassMetadata), name)
        });

        let descriptor = self.reserve(DESCRIPTOR_ALIGN, CLASS_DESCRIPTOR_SIZE);
        self.put_type_context(descriptor, ContextDescriptorKind::Class, &nominal);
        let prefix_words = class_metadata::SIZE / WORD_SIZE;
        self.put_u32(
            descriptor + class_descriptor::METADATA_NEGATIVE_SIZE_IN_WORDS,
            CLASS_NEGATIVE_WORDS as u32,
        );
        self.put_u32(
            descriptor + class_descriptor::METADATA_POSITIVE_SIZE_IN_WORDS,
            prefix_words as u32,
        );
        self.put_u32(
            descriptor + class_descriptor::NUM_FIELDS,
            nominal.fields.len() as u32,
        );
        if let Some((_, name)) = &superclass {
            let name_at = self.push_mangled(name);
            self.put_rel(descriptor + class_descriptor::SUPERCLASS_TYPE, name_at);
        }
        let superclass_name = superclass.as_ref().map(|(_, name)| name.as_slice());
        self.put_fields(descriptor, FieldDescriptorKind::Class, &nominal, superclass_name);

        let negative = CLASS_NEGATIVE_WORDS * WORD_SIZE;
        let start = self.reserve(WORD_SIZE, negative + class_metadata::SIZE);
        let metadata = start + negative;
        self.put_word(metadata + class_metadata::KIND, nominal.raw_kind.unwrap_or(0));
        if let Some((target, _)) = superclass {
            self.put_abs(metadata + class_metadata::SUPERCLASS, target);
        }
        if OBJC_INTEROP && linked {
            self.put_word(metadata + class_metadata::DATA, 1);
        }
        self.put_u32(metadata + class_metadata::INSTANCE_SIZE, instance_size);
        self.put_u16(
            metadata + class_metadata::INSTANCE_ALIGNMENT_MASK,
            (WORD_SIZE - 1) as u16,
        );
        self.put_u32(
            metadata + class_metadata::CLASS_SIZE,
            (negative + class_metadata::SIZE) as u32,
        );
        self.put_u32(metadata + class_metadata::CLASS_ADDRESS_POINT, negative as u32);
        if linked {
            self.put_abs(metadata + class_metadata::DESCRIPTOR, descriptor);
        }

        TypeSymbols {
            metadata: self.symbol(metadata, Role::ClassMetadata),
            descriptor: self.symbol(descriptor, Role::Context),
        }
    }

    /// Copy the bytes into aligned storage and patch absolute pointers.
    pub fn finish(self) -> MetadataImage {
        let mut storage = AlignedVec::copy_from_slice(&self.bytes);
        let base = storage.as_ptr() as usize;
        for relocation in &self.relocations {
            storage.write_word(relocation.at, base + relocation.target);
        }
        tracing::debug!(
            image = self.image,
            len = storage.len(),
            relocations = self.relocations.len(),
            "metadata image built"
        );
        MetadataImage {
            id: self.image,
            storage,
        }
    }

    fn put_type_context(&mut self, at: usize, kind: ContextDescriptorKind, nominal: &Nominal) {
        self.put_flags(at, kind);
        self.put_parent(at, nominal.parent);
        let name_at = self.push_bytes(nominal.name.as_bytes());
        self.put_rel(at + context::NAME, name_at);
    }

    /// Emit the field descriptor for `nominal` and link it from `descriptor`.
    fn put_fields(
        &mut self,
        descriptor: usize,
        kind: FieldDescriptorKind,
        nominal: &Nominal,
        superclass: Option<&[u8]>,
    ) {
        if !nominal.field_descriptor {
            return;
        }
        let stride = (nominal.record_size as usize).max(FIELD_RECORD_SIZE);
        let at = self.reserve(
            DESCRIPTOR_ALIGN,
            FIELD_DESCRIPTOR_HEADER_SIZE + nominal.fields.len() * stride,
        );
        self.put_u16(at + field_descriptor::KIND, kind.to_raw());
        self.put_u16(at + field_descriptor::FIELD_RECORD_SIZE, nominal.record_size);
        self.put_u32(at + field_descriptor::NUM_FIELDS, nominal.fields.len() as u32);
        if let Some(name) = &nominal.mangled_name {
            let name_at = self.push_mangled(name);
            self.put_rel(at + field_descriptor::MANGLED_TYPE_NAME, name_at);
        }
        if let Some(name) = superclass {
            let name_at = self.push_mangled(name);
            self.put_rel(at + field_descriptor::SUPERCLASS, name_at);
        }

        for (index, field) in nominal.fields.iter().enumerate() {
            let record = at + FIELD_DESCRIPTOR_HEADER_SIZE + index * stride;
            self.put_u32(record + field_descriptor::RECORD_FLAGS, field.flags);
            if let Some(name) = &field.mangled_type_name {
                let name_at = self.push_mangled(name);
                self.put_rel(record + field_descriptor::RECORD_MANGLED_TYPE_NAME, name_at);
            }
            let name_at = self.push_bytes(field.name.as_bytes());
            self.put_rel(record + field_descriptor::RECORD_FIELD_NAME, name_at);
        }

        self.put_rel(descriptor + context::FIELDS, at);
    }

    fn put_flags(&mut self, at: usize, kind: ContextDescriptorKind) {
        let flags = ContextDescriptorFlags::for_kind(kind).bits() | ContextDescriptorFlags::IS_UNIQUE;
        self.put_u32(at + context::FLAGS, flags);
    }

    fn put_parent(&mut self, at: usize, parent: Option<ParentLink>) {
        match parent {
            None => {}
            Some(ParentLink::Direct(symbol)) => {
                let target = self.resolve(symbol, Role::Context);
                self.put_rel(at + context::PARENT, target);
            }
            Some(ParentLink::Indirect(symbol)) => {
                let target = self.resolve(symbol, Role::Context);
                let slot = self.reserve(WORD_SIZE, WORD_SIZE);
                self.put_abs(slot, target);
                let delta = ensure_rel32(slot as isize - (at + context::PARENT) as isize);
                self.put_u32(at + context::PARENT, (delta | 1) as u32);
            }
        }
    }

    fn symbol(&self, offset: usize, role: Role) -> Symbol {
        Symbol {
            image: self.image,
            offset,
            role,
        }
    }

    fn resolve(&self, symbol: Symbol, role: Role) -> usize {
        ensure_role(symbol, self.image, role);
        symbol.offset
    }

    fn reserve(&mut self, align: usize, size: usize) -> usize {
        let at = self.bytes.len().next_multiple_of(align);
        self.bytes.resize(at + size, 0);
        at
    }

    /// Append `bytes` and a NUL terminator.
    fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        let at = self.bytes.len();
        self.bytes.extend_from_slice(bytes);
        self.bytes.push(0);
        at
    }

    fn push_mangled(&mut self, bytes: &[u8]) -> usize {
        ensure_well_formed_mangled(bytes);
        self.push_bytes(bytes)
    }

    fn put_u16(&mut self, at: usize, value: u16) {
        self.bytes[at..at + 2].copy_from_slice(&value.to_ne_bytes());
    }

    fn put_u32(&mut self, at: usize, value: u32) {
        self.bytes[at..at + 4].copy_from_slice(&value.to_ne_bytes());
    }

    fn put_word(&mut self, at: usize, value: usize) {
        self.bytes[at..at + WORD_SIZE].copy_from_slice(&value.to_ne_bytes());
    }

    fn put_rel(&mut self, at: usize, target: usize) {
        let delta = ensure_rel32(target as isize - at as isize);
        self.put_u32(at, delta as u32);
    }

    fn put_abs(&mut self, at: usize, target: usize) {
        self.relocations.push(Relocation { at, target });
    }
}
