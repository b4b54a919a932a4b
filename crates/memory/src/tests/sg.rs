use crate::phys::{DenseMemory, GuestMemory};
use crate::sg::{copy_from_buf, copy_to_buf, total_len, SgSegment};

fn mem_with(contents: &[(u64, &[u8])]) -> DenseMemory {
    let mut mem = DenseMemory::new(0x1000).unwrap();
    for (addr, bytes) in contents {
        mem.write_from(*addr, bytes).unwrap();
    }
    mem
}

#[test]
fn total_len_sums_segment_lengths_including_empty_segments() {
    let segs = [
        SgSegment::new(0x100, 3),
        SgSegment::new(0x200, 0),
        SgSegment::new(0x300, 5),
    ];
    assert_eq!(total_len(&segs), 8);
    assert_eq!(total_len(&[]), 0);
}

#[test]
fn copy_to_buf_straddles_a_segment_boundary() {
    let mem = mem_with(&[(0x100, b"ABC"), (0x200, b"DE")]);
    let segs = [SgSegment::new(0x100, 3), SgSegment::new(0x200, 2)];

    let mut buf = [0u8; 2];
    let copied = copy_to_buf(&mem, &segs, 2, &mut buf).unwrap();
    assert_eq!(copied, 2);
    assert_eq!(&buf, b"CD");
}

#[test]
fn copy_from_buf_truncates_to_remaining_capacity() {
    let mut mem = DenseMemory::new(0x1000).unwrap();
    let segs = [SgSegment::new(0x10, 4), SgSegment::new(0x20, 4)];

    // Capacity 8, offset 6: only 2 bytes fit even though the source has 3.
    let copied = copy_from_buf(&mut mem, &segs, 6, b"XYZ").unwrap();
    assert_eq!(copied, 2);

    let mut tail = [0u8; 2];
    mem.read_into(0x22, &mut tail).unwrap();
    assert_eq!(&tail, b"XY");
}

#[test]
fn copy_at_full_offset_and_empty_buffer_are_noops() {
    let mut mem = mem_with(&[(0x100, b"ABCDE")]);
    let segs = [SgSegment::new(0x100, 5)];

    assert_eq!(copy_from_buf(&mut mem, &segs, 5, b"zz").unwrap(), 0);
    assert_eq!(copy_from_buf(&mut mem, &segs, 1000, b"zz").unwrap(), 0);
    assert_eq!(copy_from_buf(&mut mem, &segs, 0, b"").unwrap(), 0);

    let mut buf = [0u8; 4];
    assert_eq!(copy_to_buf(&mem, &segs, 5, &mut buf).unwrap(), 0);
    assert_eq!(copy_to_buf(&mem, &segs, 0, &mut []).unwrap(), 0);

    // The no-op copies left the segment contents alone.
    let mut all = [0u8; 5];
    mem.read_into(0x100, &mut all).unwrap();
    assert_eq!(&all, b"ABCDE");
}

#[test]
fn zero_length_segments_are_skipped() {
    let mem = mem_with(&[(0x100, b"AB"), (0x300, b"CD")]);
    let segs = [
        SgSegment::new(0x200, 0),
        SgSegment::new(0x100, 2),
        SgSegment::new(0x400, 0),
        SgSegment::new(0x300, 2),
    ];

    let mut buf = [0u8; 4];
    assert_eq!(copy_to_buf(&mem, &segs, 0, &mut buf).unwrap(), 4);
    assert_eq!(&buf, b"ABCD");

    let mut mid = [0u8; 2];
    assert_eq!(copy_to_buf(&mem, &segs, 1, &mut mid).unwrap(), 2);
    assert_eq!(&mid, b"BC");
}

#[test]
fn out_of_range_segment_addresses_surface_as_errors() {
    let mut mem = DenseMemory::new(0x100).unwrap();
    let segs = [SgSegment::new(0xFFFF_0000, 4)];

    assert!(copy_from_buf(&mut mem, &segs, 0, b"!!").is_err());
    let mut buf = [0u8; 2];
    assert!(copy_to_buf(&mem, &segs, 0, &mut buf).is_err());
}

#[cfg(not(target_arch = "wasm32"))]
mod properties {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        // Disjoint segments carved out of a 4 KiB guest RAM, 0..=4 of them,
        // each 0..=64 bytes long (zero-length segments included on purpose).
        fn arb_segments()(lens in prop::collection::vec(0u32..=64, 0..=4)) -> Vec<SgSegment> {
            let mut segs = Vec::with_capacity(lens.len());
            let mut addr = 0u64;
            for len in lens {
                segs.push(SgSegment::new(addr, len));
                addr += u64::from(len) + 16;
            }
            segs
        }
    }

    proptest! {
        #[test]
        fn copy_length_is_min_of_request_and_remaining_capacity(
            segs in arb_segments(),
            offset in 0u64..=300,
            data in prop::collection::vec(any::<u8>(), 0..=300),
        ) {
            let mut mem = DenseMemory::new(0x1000).unwrap();
            let expected = data.len().min(total_len(&segs).saturating_sub(offset) as usize);

            let written = copy_from_buf(&mut mem, &segs, offset, &data).unwrap();
            prop_assert_eq!(written, expected);

            let mut out = vec![0u8; data.len()];
            let read = copy_to_buf(&mem, &segs, offset, &mut out).unwrap();
            prop_assert_eq!(read, expected);

            // What came back is what went in.
            prop_assert_eq!(&out[..read], &data[..written]);
        }
    }
}
