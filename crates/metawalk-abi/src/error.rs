//! Errors reported by the `try_*` entry points.
//!
//! Each variant is a contract violation: the caller handed over something
//! that is not the metadata it claimed. The panicking entry points report the
//! same conditions with the same text.

use crate::context::ContextDescriptorKind;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("type handle {handle:#x} has metadata kind {raw:#x}, which is neither a struct nor a class")]
    UnsupportedKind { handle: usize, raw: usize },
    #[error("type handle {handle:#x} is not a {expected}")]
    WrongKind {
        handle: usize,
        expected: &'static str,
    },
    #[error("{what} at {address:#x} is not {align}-byte aligned")]
    Misaligned {
        what: &'static str,
        address: usize,
        align: usize,
    },
    #[error("type handle {handle:#x} has no descriptor")]
    NullDescriptor { handle: usize },
    #[error("descriptor at {address:#x} describes a {found:?}, expected a {expected:?}")]
    DescriptorKindMismatch {
        address: usize,
        expected: ContextDescriptorKind,
        found: ContextDescriptorKind,
    },
    #[error("field descriptor at {address:#x} declares record size {size} (minimum 12, multiple of 4)")]
    InvalidFieldRecordSize { address: usize, size: u16 },
    #[error("field layout of class {handle:#x} is not supported")]
    ClassFieldLayoutUnsupported { handle: usize },
}

pub(crate) fn check_aligned(
    addr: metawalk_core::Addr<'_>,
    align: usize,
    what: &'static str,
) -> Result<(), MetadataError> {
    if addr.is_aligned_to(align) {
        Ok(())
    } else {
        Err(MetadataError::Misaligned {
            what,
            address: addr.address(),
            align,
        })
    }
}
