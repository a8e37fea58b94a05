//! Field descriptors: per-field names, encoded type names and flags.
//!
//! A field descriptor is a 16-byte header followed by `num_fields` records,
//! each `field_record_size` bytes long. Records are read in place; the
//! iterator only carries an index, so enumerating twice yields the same
//! sequence.

use std::ffi::CStr;
use std::fmt;
use std::iter::FusedIterator;

use bytemuck::AnyBitPattern;
use metawalk_core::{Addr, MangledName, RelativeDirectPointer};
use serde::Serialize;

use crate::MetadataError;
use crate::constants::{
    DESCRIPTOR_ALIGN, FIELD_DESCRIPTOR_HEADER_SIZE, FIELD_RECORD_SIZE, field_descriptor,
};
use crate::error::check_aligned;

/// What kind of type a field descriptor belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FieldDescriptorKind {
    Struct,
    Class,
    Enum,
    MultiPayloadEnum,
    Protocol,
    ClassProtocol,
    ObjCProtocol,
    ObjCClass,
    Other(u16),
}

impl FieldDescriptorKind {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Struct,
            1 => Self::Class,
            2 => Self::Enum,
            3 => Self::MultiPayloadEnum,
            4 => Self::Protocol,
            5 => Self::ClassProtocol,
            6 => Self::ObjCProtocol,
            7 => Self::ObjCClass,
            other => Self::Other(other),
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            Self::Struct => 0,
            Self::Class => 1,
            Self::Enum => 2,
            Self::MultiPayloadEnum => 3,
            Self::Protocol => 4,
            Self::ClassProtocol => 5,
            Self::ObjCProtocol => 6,
            Self::ObjCClass => 7,
            Self::Other(raw) => raw,
        }
    }
}

/// Flags word of a field record, kept as stored.
///
/// Named masks are provided for callers; unknown bits are preserved.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct FieldRecordFlags(u32);

impl FieldRecordFlags {
    /// Enum case stored out of line.
    pub const IS_INDIRECT_CASE: u32 = 0x1;
    /// Mutable stored property.
    pub const IS_VAR: u32 = 0x2;
    /// Compiler-synthesized field.
    pub const IS_ARTIFICIAL: u32 = 0x4;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub fn is_indirect_case(self) -> bool {
        self.contains(Self::IS_INDIRECT_CASE)
    }

    pub fn is_var(self) -> bool {
        self.contains(Self::IS_VAR)
    }

    pub fn is_artificial(self) -> bool {
        self.contains(Self::IS_ARTIFICIAL)
    }
}

impl fmt::Debug for FieldRecordFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldRecordFlags({:#x})", self.0)
    }
}

/// View of a field descriptor header and its records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FieldDescriptor<'a> {
    addr: Addr<'a>,
}

impl<'a> FieldDescriptor<'a> {
    /// View the field descriptor at `addr`, validating its alignment and
    /// declared record size.
    ///
    /// # Safety
    /// `addr` must point to a field descriptor header followed by
    /// `num_fields` records of the declared size, all readable for `'a`,
    /// and every present relative pointer in them must target a valid name.
    pub unsafe fn from_addr(addr: Addr<'a>) -> Result<Self, MetadataError> {
        check_aligned(addr, DESCRIPTOR_ALIGN, "field descriptor")?;
        // SAFETY: the aligned header is readable per the caller.
        let size = unsafe { addr.read_at::<u16>(field_descriptor::FIELD_RECORD_SIZE) };
        if (size as usize) < FIELD_RECORD_SIZE || !(size as usize).is_multiple_of(DESCRIPTOR_ALIGN) {
            return Err(MetadataError::InvalidFieldRecordSize {
                address: addr.address(),
                size,
            });
        }
        Ok(Self { addr })
    }

    pub fn addr(self) -> Addr<'a> {
        self.addr
    }

    pub fn kind(self) -> FieldDescriptorKind {
        FieldDescriptorKind::from_raw(self.read(field_descriptor::KIND))
    }

    /// Encoded name of the type this descriptor belongs to.
    pub fn mangled_type_name(self) -> Option<MangledName<'a>> {
        self.mangled(field_descriptor::MANGLED_TYPE_NAME)
    }

    /// Encoded name of the superclass, for class descriptors that have one.
    pub fn superclass(self) -> Option<MangledName<'a>> {
        self.mangled(field_descriptor::SUPERCLASS)
    }

    pub fn record_size(self) -> usize {
        self.read::<u16>(field_descriptor::FIELD_RECORD_SIZE) as usize
    }

    pub fn num_fields(self) -> usize {
        self.read::<u32>(field_descriptor::NUM_FIELDS) as usize
    }

    /// Record at `index`, or `None` past the end.
    ///
    /// # Panics
    /// Panics if the record's field name offset is absent.
    pub fn record(self, index: usize) -> Option<FieldRecord<'a>> {
        (index < self.num_fields()).then(|| self.record_unchecked(index))
    }

    /// # Panics
    /// The iterator panics on a record whose field name offset is absent.
    pub fn records(self) -> FieldRecords<'a> {
        FieldRecords {
            descriptor: self,
            front: 0,
            back: self.num_fields(),
        }
    }

    fn record_unchecked(self, index: usize) -> FieldRecord<'a> {
        let base = self
            .addr
            .byte_add(FIELD_DESCRIPTOR_HEADER_SIZE + index * self.record_size());
        // SAFETY: `index < num_fields`, so the record lies within the run the
        // construction contract makes readable; its fields are 4-aligned since
        // the header is and the record size is a multiple of 4.
        unsafe {
            let flags = base.read_at::<u32>(field_descriptor::RECORD_FLAGS);
            let type_name = RelativeDirectPointer::<MangledName<'a>>::read(
                base.byte_add(field_descriptor::RECORD_MANGLED_TYPE_NAME),
            );
            let field_name = RelativeDirectPointer::<&'a CStr>::read(
                base.byte_add(field_descriptor::RECORD_FIELD_NAME),
            );
            FieldRecord {
                flags: FieldRecordFlags(flags),
                mangled_type_name: type_name.try_get(),
                field_name: field_name.get(),
            }
        }
    }

    fn mangled(self, offset: usize) -> Option<MangledName<'a>> {
        // SAFETY: header fields at `offset` are relative name pointers.
        unsafe { RelativeDirectPointer::<MangledName<'a>>::read(self.addr.byte_add(offset)) }
            .try_get()
    }

    fn read<T: AnyBitPattern>(self, offset: usize) -> T {
        // SAFETY: `offset` is a header field and the header is readable.
        unsafe { self.addr.read_at::<T>(offset) }
    }
}

/// One field: its declared name, encoded type name and flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FieldRecord<'a> {
    pub flags: FieldRecordFlags,
    /// Absent for fields whose type is not recorded (e.g. payload-less enum cases).
    pub mangled_type_name: Option<MangledName<'a>>,
    pub field_name: &'a CStr,
}

impl FieldRecord<'_> {
    /// The field name as text, replacing invalid UTF-8.
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.field_name.to_string_lossy()
    }
}

/// Iterator over the records of a [`FieldDescriptor`].
#[derive(Clone, Debug)]
pub struct FieldRecords<'a> {
    descriptor: FieldDescriptor<'a>,
    front: usize,
    back: usize,
}

impl<'a> Iterator for FieldRecords<'a> {
    type Item = FieldRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let record = self.descriptor.record_unchecked(self.front);
        self.front += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for FieldRecords<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.descriptor.record_unchecked(self.back))
    }
}

impl ExactSizeIterator for FieldRecords<'_> {}

impl FusedIterator for FieldRecords<'_> {}

/// Enumerate the records of `descriptor` in declaration order.
///
/// The result depends only on the descriptor's address, so calling this
/// again restarts the enumeration.
///
/// # Panics
/// The iterator panics on a record whose field name offset is absent.
pub fn enumerate_fields(descriptor: FieldDescriptor<'_>) -> FieldRecords<'_> {
    descriptor.records()
}
