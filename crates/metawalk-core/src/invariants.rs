//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use std::ptr::NonNull;

use crate::Addr;

pub(crate) fn ensure_non_null(ptr: *mut u8, base: usize, delta: isize) -> NonNull<u8> {
    NonNull::new(ptr).unwrap_or_else(|| {
        panic!("address arithmetic wrapped to null: {base:#x} + {delta}")
    })
}

pub(crate) fn ensure_present(anchor: Addr<'_>, offset: i32) {
    if offset == 0 {
        panic!(
            "relative offset at {anchor:?} is absent \
             (caller must check `is_null` before resolving)"
        );
    }
}

pub(crate) fn ensure_aligned(addr: Addr<'_>, align: usize, what: &str) {
    if !addr.is_aligned_to(align) {
        panic!("{what} at {addr:?} is not {align}-byte aligned");
    }
}

pub(crate) fn ensure_indirect_target<'a>(slot: Addr<'a>, target: Option<Addr<'a>>) -> Addr<'a> {
    target.unwrap_or_else(|| panic!("indirect relative pointer slot at {slot:?} holds null"))
}
