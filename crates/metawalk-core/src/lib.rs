#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Memory primitives shared by the metawalk crates.
//!
//! - [`Addr`]: a borrowed address into immutable, externally owned memory
//! - [`RelativeDirectPointer`] / [`RelativeIndirectablePointer`]: self-relative
//!   32-bit references, resolved against the address they are stored at
//! - [`MangledName`]: raw encoded type names with symbolic-reference aware extent
//! - [`sync`]: locks for the owning system's mutable bookkeeping
//! - [`Colors`]: highlighting for layout dumps

mod addr;
mod colors;
mod invariants;
mod mangled;
pub mod relative;
pub mod sync;

#[cfg(test)]
mod addr_tests;
#[cfg(test)]
mod sync_tests;

pub use addr::{Addr, WORD_SIZE};
pub use colors::Colors;
pub use mangled::{MangledName, symbolic_reference_len};
pub use relative::{
    Pointee, RelativeDirectPointer, RelativeIndirectablePointer, is_absent, resolve,
    try_resolve,
};
pub use sync::{Lock, UnsafeLock, UnsafeRecursiveLock};
