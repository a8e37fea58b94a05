//! Raw encoded (mangled) type names.
//!
//! Names are NUL-terminated, but may embed symbolic references: a control
//! byte in `0x01..=0x17` is followed by a 4-byte relative offset, and one in
//! `0x18..=0x1F` by a pointer-sized absolute address. Those payloads can
//! contain zero bytes, so the extent of a name is found by skipping them.
//! Names are surfaced as bytes; nothing here demangles.

use std::fmt;

use crate::relative::Pointee;
use crate::{Addr, WORD_SIZE};

/// Payload length following a symbolic-reference control byte, if `byte` is one.
#[inline]
pub fn symbolic_reference_len(byte: u8) -> Option<usize> {
    match byte {
        0x01..=0x17 => Some(4),
        0x18..=0x1F => Some(WORD_SIZE),
        _ => None,
    }
}

/// An encoded type name, excluding its terminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MangledName<'a> {
    bytes: &'a [u8],
}

impl<'a> MangledName<'a> {
    /// Wrap bytes that are already known to span exactly one name.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Scan the name starting at `addr`.
    ///
    /// # Safety
    /// `addr` must start a well-formed encoded name whose bytes, including
    /// symbolic-reference payloads and the terminator, are readable for `'a`.
    pub unsafe fn read(addr: Addr<'a>) -> Self {
        let start = addr.as_ptr();
        let mut len = 0;
        loop {
            // SAFETY: well-formed names are readable up to the terminator.
            let byte = unsafe { *start.add(len) };
            match byte {
                0 => break,
                _ => len += 1 + symbolic_reference_len(byte).unwrap_or(0),
            }
        }
        // SAFETY: the scanned bytes were all readable.
        Self {
            bytes: unsafe { addr.slice::<u8>(len) },
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the name embeds any symbolic reference.
    pub fn has_symbolic_references(&self) -> bool {
        self.symbolic_references().next().is_some()
    }

    /// Embedded symbolic references as `(control byte, payload)` pairs, in order.
    ///
    /// A payload cut short by the end of the name is yielded truncated.
    pub fn symbolic_references(&self) -> impl Iterator<Item = (u8, &'a [u8])> + use<'a> {
        let bytes = self.bytes;
        let mut pos = 0;
        std::iter::from_fn(move || {
            while let Some(&byte) = bytes.get(pos) {
                pos += 1;
                if let Some(payload) = symbolic_reference_len(byte) {
                    let end = (pos + payload).min(bytes.len());
                    let found = &bytes[pos..end];
                    pos = end;
                    return Some((byte, found));
                }
            }
            None
        })
    }

    /// The name as text, when it is plain UTF-8 with no symbolic references.
    pub fn as_str(&self) -> Option<&'a str> {
        if self.has_symbolic_references() {
            return None;
        }
        std::str::from_utf8(self.bytes).ok()
    }
}

impl<'a> Pointee<'a> for MangledName<'a> {
    const ALIGN: usize = 1;

    unsafe fn from_addr(addr: Addr<'a>) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { Self::read(addr) }
    }
}

/// Printable ASCII is shown as is, everything else as `\xNN`.
impl fmt::Display for MangledName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.bytes {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MangledName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MangledName(\"{self}\")")
    }
}
