use crate::bus::{MmioHandler, PhysicalMemoryBus};
use std::sync::{Arc, Mutex};

struct RecordingMmio {
    reads: Arc<Mutex<Vec<(u64, usize)>>>,
    writes: Arc<Mutex<Vec<(u64, usize, u64)>>>,
    value: u64,
}

impl MmioHandler for RecordingMmio {
    fn read(&mut self, offset: u64, size: usize) -> u64 {
        self.reads.lock().unwrap().push((offset, size));
        self.value
    }

    fn write(&mut self, offset: u64, size: usize, value: u64) {
        self.writes.lock().unwrap().push((offset, size, value));
    }
}

#[test]
fn mmio_precedes_ram_and_receives_region_relative_offsets() {
    let reads = Arc::new(Mutex::new(Vec::new()));
    let writes = Arc::new(Mutex::new(Vec::new()));
    let handler = RecordingMmio {
        reads: reads.clone(),
        writes: writes.clone(),
        value: 0xFE,
    };

    let mut bus = PhysicalMemoryBus::with_ram_size(0x2000);
    bus.write_u8(0x1004, 0x11);
    bus.map_mmio(0x1000, 0x10, Box::new(handler));

    // The RAM byte underneath the window is shadowed.
    assert_eq!(bus.read_u8(0x1004), 0xFE);
    bus.write_u32(0x1008, 0x7777_7777);

    assert_eq!(reads.lock().unwrap().as_slice(), &[(4, 1)]);
    assert_eq!(writes.lock().unwrap().as_slice(), &[(8, 4, 0x7777_7777)]);

    // Accesses outside the window go to RAM again, which kept its contents.
    bus.write_u8(0x1FFF, 0x42);
    assert_eq!(bus.read_u8(0x1FFF), 0x42);
}

#[test]
fn unmapped_reads_return_all_ones() {
    let mut bus = PhysicalMemoryBus::with_ram_size(0x10);

    assert_eq!(bus.read_u8(0x1000), 0xFF);
    assert_eq!(bus.read_u16(0x1000), 0xFFFF);
    assert_eq!(bus.read_u32(0x1000), 0xFFFF_FFFF);
    assert_eq!(bus.read_u64(0x1000), 0xFFFF_FFFF_FFFF_FFFF);

    // Writes past the end of RAM are swallowed.
    bus.write_u32(0x1000, 0x1234_5678);
    assert_eq!(bus.read_u32(0x1000), 0xFFFF_FFFF);
}

#[test]
fn boundary_crossing_reads_and_writes_are_le_correct() {
    let mut bus = PhysicalMemoryBus::with_ram_size(2);
    bus.write_u8(0, 0x11);
    bus.write_u8(1, 0x22);

    assert_eq!(bus.read_u16(0), 0x2211);
    assert_eq!(bus.read_u16(1), 0xFF22);

    bus.write_u16(1, 0xBBAA);
    assert_eq!(bus.read_u8(1), 0xAA);
    assert_eq!(bus.read_u8(2), 0xFF);
}

#[test]
#[should_panic(expected = "overlapping MMIO regions")]
fn overlapping_mmio_regions_panic() {
    struct Noop;

    impl MmioHandler for Noop {
        fn read(&mut self, _offset: u64, _size: usize) -> u64 {
            0
        }

        fn write(&mut self, _offset: u64, _size: usize, _value: u64) {}
    }

    let mut bus = PhysicalMemoryBus::with_ram_size(0x1000);
    bus.map_mmio(0x2000, 0x100, Box::new(Noop));
    bus.map_mmio(0x20F0, 0x100, Box::new(Noop));
}
