//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use metawalk_core::{Addr, symbolic_reference_len};

use crate::MetadataError;
use crate::image::{Role, Symbol};

/// Unwrap a validation result, turning a contract violation into a panic.
pub(crate) fn ensure_valid<T>(result: Result<T, MetadataError>) -> T {
    result.unwrap_or_else(|err| panic!("{err}"))
}

pub(crate) fn ensure_rel32(delta: isize) -> i32 {
    i32::try_from(delta)
        .unwrap_or_else(|_| panic!("relative offset {delta} does not fit in 32 bits"))
}

pub(crate) fn ensure_role(symbol: Symbol, image: u32, role: Role) {
    if symbol.image != image {
        panic!("{symbol:?} belongs to image {}, not image {image}", symbol.image);
    }
    if symbol.role != role {
        panic!("{symbol:?} is a {:?}, expected a {role:?}", symbol.role);
    }
}

pub(crate) fn ensure_metadata(symbol: Symbol, image: u32) {
    match symbol.role {
        Role::StructMetadata | Role::ClassMetadata => ensure_role(symbol, image, symbol.role),
        Role::Context => panic!("{symbol:?} is a context, not type metadata"),
    }
}

pub(crate) fn ensure_base(base: Option<Addr<'_>>) -> Addr<'_> {
    base.unwrap_or_else(|| panic!("image storage has a null base"))
}

/// Every symbolic-reference control byte must be followed by its full payload.
pub(crate) fn ensure_well_formed_mangled(bytes: &[u8]) {
    let mut pos = 0;
    while let Some(&byte) = bytes.get(pos) {
        pos += 1 + symbolic_reference_len(byte).unwrap_or(0);
    }
    if pos != bytes.len() {
        panic!("encoded name {bytes:x?} ends inside a symbolic reference");
    }
}
