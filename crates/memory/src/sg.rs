//! Scatter-gather copies between a flat buffer and a list of discontiguous
//! guest memory segments.
//!
//! A segment list is treated as one logical contiguous buffer: offsets index
//! into the concatenation of all segments in order. These helpers never fail
//! on capacity: copies are silently truncated to what the list can hold past
//! `offset`, and callers that need strict bounds use [`total_len`] up front.
//! Only an out-of-range guest physical access is an error.

use crate::phys::{GuestMemory, GuestMemoryResult};

/// A non-owning reference to one contiguous guest memory region.
///
/// Zero-length segments are legal and contribute nothing to the logical
/// buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SgSegment {
    pub addr: u64,
    pub len: u32,
}

impl SgSegment {
    pub fn new(addr: u64, len: u32) -> Self {
        Self { addr, len }
    }
}

/// Total capacity of the segment list in bytes.
pub fn total_len(segs: &[SgSegment]) -> u64 {
    segs.iter().map(|seg| u64::from(seg.len)).sum()
}

/// Copy `buf` into the logical concatenation of `segs` starting at `offset`.
///
/// Returns the number of bytes copied, which is less than `buf.len()` when
/// the list's capacity past `offset` is smaller.
pub fn copy_from_buf(
    mem: &mut dyn GuestMemory,
    segs: &[SgSegment],
    offset: u64,
    buf: &[u8],
) -> GuestMemoryResult<usize> {
    let mut offset = offset;
    let mut seg_off = 0u64;
    let mut copied = 0usize;
    for seg in segs {
        if copied == buf.len() {
            break;
        }
        let seg_len = u64::from(seg.len);
        if offset < seg_off + seg_len {
            let within = offset - seg_off;
            // seg_len - within fits in usize: segment lengths are u32.
            let take = ((seg_len - within) as usize).min(buf.len() - copied);
            mem.write_from(seg.addr + within, &buf[copied..copied + take])?;
            copied += take;
            offset += take as u64;
        }
        seg_off += seg_len;
    }
    Ok(copied)
}

/// Copy from the logical concatenation of `segs` at `offset` into `buf`.
///
/// Mirror of [`copy_from_buf`]; returns the number of bytes copied.
pub fn copy_to_buf(
    mem: &dyn GuestMemory,
    segs: &[SgSegment],
    offset: u64,
    buf: &mut [u8],
) -> GuestMemoryResult<usize> {
    let mut offset = offset;
    let mut seg_off = 0u64;
    let mut copied = 0usize;
    for seg in segs {
        if copied == buf.len() {
            break;
        }
        let seg_len = u64::from(seg.len);
        if offset < seg_off + seg_len {
            let within = offset - seg_off;
            let take = ((seg_len - within) as usize).min(buf.len() - copied);
            mem.read_into(seg.addr + within, &mut buf[copied..copied + take])?;
            copied += take;
            offset += take as u64;
        }
        seg_off += seg_len;
    }
    Ok(copied)
}
