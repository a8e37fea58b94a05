use crate::{Addr, WORD_SIZE};

#[repr(C, align(16))]
struct Buf([u8; 32]);

fn addr_of(buf: &Buf) -> Addr<'_> {
    // SAFETY: `buf` is live and unmodified for the returned lifetime.
    unsafe { Addr::from_ptr(buf.0.as_ptr()) }.unwrap()
}

#[test]
fn null_is_rejected() {
    // SAFETY: null never produces an address.
    assert!(unsafe { Addr::from_ptr(std::ptr::null()) }.is_none());
}

#[test]
fn alignment_and_offsets() {
    let buf = Buf([0; 32]);
    let base = addr_of(&buf);

    assert!(base.is_aligned_to(16));
    assert!(!base.byte_add(1).is_aligned_to(2));
    assert_eq!(base.byte_add(12).address(), base.address() + 12);
    assert_eq!(base.byte_add(12).byte_offset(-12), base);
}

#[test]
fn reads_little_endian_words() {
    let mut buf = Buf([0; 32]);
    buf.0[4..8].copy_from_slice(&(-24i32).to_ne_bytes());
    buf.0[8..12].copy_from_slice(&7u32.to_ne_bytes());
    let base = addr_of(&buf);

    // SAFETY: offsets are aligned and inside the buffer.
    unsafe {
        assert_eq!(base.read_at::<i32>(4), -24);
        assert_eq!(base.read_at::<u32>(8), 7);
        assert_eq!(base.byte_add(8).slice::<u32>(2), &[7, 0]);
    }
}

#[test]
fn reads_pointer_words() {
    let mut buf = Buf([0; 32]);
    let target = 0x1000usize;
    buf.0[WORD_SIZE..2 * WORD_SIZE].copy_from_slice(&target.to_ne_bytes());
    let base = addr_of(&buf);

    // SAFETY: both words are inside the buffer; nothing dereferences the target.
    unsafe {
        assert!(base.read_addr_at(0).is_none());
        assert_eq!(base.read_addr_at(WORD_SIZE).unwrap().address(), target);
    }
}

#[test]
fn c_strings() {
    let mut buf = Buf([0; 32]);
    buf.0[..5].copy_from_slice(b"Point");
    let base = addr_of(&buf);

    // SAFETY: the buffer holds a terminated string.
    let name = unsafe { base.c_str() };
    assert_eq!(name.to_bytes(), b"Point");
}

#[test]
fn debug_is_hex() {
    let buf = Buf([0; 32]);
    let base = addr_of(&buf);
    assert_eq!(format!("{base:?}"), format!("{:#x}", base.address()));
}
