use crate::phys::{DenseMemory, GuestMemory};

/// Handler for a memory-mapped I/O region.
///
/// `offset` is relative to the start of the mapped region. `size` is the
/// access width in bytes (1, 2, 4 or 8); values are little-endian in the low
/// `size` bytes of the `u64`.
pub trait MmioHandler {
    fn read(&mut self, offset: u64, size: usize) -> u64;
    fn write(&mut self, offset: u64, size: usize, value: u64);
}

struct MmioRegion {
    start: u64,
    len: u64,
    handler: Box<dyn MmioHandler>,
}

impl MmioRegion {
    fn end_exclusive(&self) -> u64 {
        self.start + self.len
    }

    fn contains(&self, paddr: u64) -> bool {
        paddr >= self.start && paddr < self.end_exclusive()
    }
}

/// Physical address router: RAM with MMIO windows layered on top.
///
/// - MMIO takes precedence over RAM.
/// - Accesses that start inside an MMIO window are forwarded whole to the
///   handler (device windows are not expected to be straddled by a single
///   CPU access).
/// - Unbacked addresses read as all ones and swallow writes.
pub struct PhysicalMemoryBus {
    pub ram: Box<dyn GuestMemory>,
    mmio: Vec<MmioRegion>,
}

impl PhysicalMemoryBus {
    pub fn new(ram: Box<dyn GuestMemory>) -> Self {
        Self {
            ram,
            mmio: Vec::new(),
        }
    }

    pub fn with_ram_size(bytes: u64) -> Self {
        let ram = DenseMemory::new(bytes).expect("failed to allocate guest RAM");
        Self::new(Box::new(ram))
    }

    /// Map an MMIO handler over `[start, start + len)`.
    ///
    /// Regions must not overlap; overlapping mappings are a host configuration
    /// bug, not guest-reachable behavior.
    pub fn map_mmio(&mut self, start: u64, len: u64, handler: Box<dyn MmioHandler>) {
        assert!(len != 0, "MMIO region length must be non-zero");
        let end_exclusive = start
            .checked_add(len)
            .expect("MMIO region wraps the physical address space");

        let idx = self.mmio.partition_point(|r| r.start < start);
        if idx > 0 {
            let prev = &self.mmio[idx - 1];
            assert!(
                start >= prev.end_exclusive(),
                "overlapping MMIO regions: new=[{start:#x}..{end_exclusive:#x}) prev=[{:#x}..{:#x})",
                prev.start,
                prev.end_exclusive()
            );
        }
        if let Some(next) = self.mmio.get(idx) {
            assert!(
                end_exclusive <= next.start,
                "overlapping MMIO regions: new=[{start:#x}..{end_exclusive:#x}) next=[{:#x}..{:#x})",
                next.start,
                next.end_exclusive()
            );
        }

        self.mmio.insert(
            idx,
            MmioRegion {
                start,
                len,
                handler,
            },
        );
    }

    fn mmio_index(&self, paddr: u64) -> Option<usize> {
        let idx = self.mmio.partition_point(|r| r.start <= paddr);
        if idx == 0 {
            return None;
        }
        self.mmio[idx - 1].contains(paddr).then_some(idx - 1)
    }

    pub fn read(&mut self, paddr: u64, size: usize) -> u64 {
        debug_assert!(matches!(size, 1 | 2 | 4 | 8));
        if let Some(idx) = self.mmio_index(paddr) {
            let region = &mut self.mmio[idx];
            return region.handler.read(paddr - region.start, size);
        }

        // RAM path, byte-wise so accesses may straddle the end of RAM; bytes
        // past the end float high.
        let mut value = 0u64;
        for i in 0..size {
            let byte = self.ram.read_u8_le(paddr + i as u64).unwrap_or(0xFF);
            value |= u64::from(byte) << (8 * i);
        }
        value
    }

    pub fn write(&mut self, paddr: u64, size: usize, value: u64) {
        debug_assert!(matches!(size, 1 | 2 | 4 | 8));
        if let Some(idx) = self.mmio_index(paddr) {
            let region = &mut self.mmio[idx];
            region.handler.write(paddr - region.start, size, value);
            return;
        }

        for i in 0..size {
            let byte = (value >> (8 * i)) as u8;
            // Writes past the end of RAM are swallowed.
            let _ = self.ram.write_u8_le(paddr + i as u64, byte);
        }
    }

    pub fn read_u8(&mut self, paddr: u64) -> u8 {
        self.read(paddr, 1) as u8
    }

    pub fn read_u16(&mut self, paddr: u64) -> u16 {
        self.read(paddr, 2) as u16
    }

    pub fn read_u32(&mut self, paddr: u64) -> u32 {
        self.read(paddr, 4) as u32
    }

    pub fn read_u64(&mut self, paddr: u64) -> u64 {
        self.read(paddr, 8)
    }

    pub fn write_u8(&mut self, paddr: u64, value: u8) {
        self.write(paddr, 1, u64::from(value));
    }

    pub fn write_u16(&mut self, paddr: u64, value: u16) {
        self.write(paddr, 2, u64::from(value));
    }

    pub fn write_u32(&mut self, paddr: u64, value: u32) {
        self.write(paddr, 4, u64::from(value));
    }

    pub fn write_u64(&mut self, paddr: u64, value: u64) {
        self.write(paddr, 8, value);
    }
}
