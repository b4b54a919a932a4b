//! ICH-7 LPC bridge diagnostics: the RCBA (Root Complex Base Address)
//! window.
//!
//! Only two registers in the 16 KiB window carry meaning for guests we run:
//! the HPET configuration pointer and GCS. Everything else reads as zero and
//! all writes are accepted and dropped. This is a stub surface, not a
//! stateful protocol. PCI configuration space for the bridge itself is
//! platform wiring and lives outside this crate.

use memory::{MmioHandler, PhysicalMemoryBus};
use tracing::trace;

/// Physical base of the RCBA window.
pub const RCBA_BASE: u64 = 0xFED1_C000;
/// The window spans 16 KiB.
pub const RCBA_SIZE: u64 = 0x4000;

/// HPET configuration pointer register offset.
pub const RCBA_HPET_CONFIG_PTR: u64 = 0x3404;
/// General Control and Status register offset.
pub const RCBA_GCS: u64 = 0x3410;

/// HPET decode enabled, block at `0xFED0_0000`.
const HPET_CONFIG_PTR_VALUE: u64 = 0xF0;

/// The RCBA diagnostic window. Stateless: two hardcoded registers, zeros
/// elsewhere, writes ignored.
#[derive(Debug, Default)]
pub struct RcbaWindow;

impl MmioHandler for RcbaWindow {
    fn read(&mut self, offset: u64, size: usize) -> u64 {
        let value = match offset {
            RCBA_HPET_CONFIG_PTR => HPET_CONFIG_PTR_VALUE,
            RCBA_GCS => 0,
            _ => 0,
        };
        trace!("rcba read offset={offset:#x} size={size} value={value:#x}");
        value
    }

    fn write(&mut self, offset: u64, size: usize, value: u64) {
        trace!("rcba write ignored offset={offset:#x} size={size} value={value:#x}");
    }
}

/// Map the RCBA window at [`RCBA_BASE`] on `bus`.
pub fn map_rcba(bus: &mut PhysicalMemoryBus) {
    bus.map_mmio(RCBA_BASE, RCBA_SIZE, Box::new(RcbaWindow));
}
