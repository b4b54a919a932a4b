//! Apple SMC controller model (I/O ports `0x300`/`0x304`).
//!
//! Intel-based Apple hardware carries an SMC chip controlling backlight, fans
//! and assorted platform parameters; it also holds the OSK ("magic key")
//! OS X guests read at boot to authenticate the platform. This model covers
//! the keyed-read subset the guest driver actually exercises: a command byte
//! on the command port, a 4-byte key plus requested length on the data port,
//! then the response bytes streamed back from the data port. Interrupt-driven
//! notification is not implemented.
//!
//! Undefined guest behavior (unknown commands, out-of-sequence writes, reads
//! past end of response) degrades silently, the way the hardware register
//! interface does; nothing here ever faults the guest.

use corevm_platform::io::{IoPortBus, PortIoDevice};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{trace, warn};

/// Data port used by the Apple SMC.
pub const APPLESMC_DATA_PORT: u16 = 0x300;
/// Command/status port used by the Apple SMC.
pub const APPLESMC_CMD_PORT: u16 = 0x304;
/// The SMC claims I/O ports `0x300..0x320`.
pub const APPLESMC_NR_PORTS: u16 = 32;
/// Byte-granularity handlers are registered over 4 consecutive ports per register.
const PORT_WIDTH: u16 = 4;

pub const APPLESMC_READ_CMD: u8 = 0x10;
// Declared by the interface but not modeled; the guest driver only issues reads.
pub const APPLESMC_WRITE_CMD: u8 = 0x11;
pub const APPLESMC_GET_KEY_BY_INDEX_CMD: u8 = 0x12;
pub const APPLESMC_GET_KEY_TYPE_CMD: u8 = 0x13;

/// Power-on status; also reported once a response has been fully consumed.
pub const SMC_STATUS_IDLE: u8 = 0x00;
/// A read command was accepted; key bytes are expected on the data port.
pub const SMC_STATUS_AWAIT_KEY: u8 = 0x0C;
/// A key byte was latched; more key bytes (then the length) are expected.
pub const SMC_STATUS_KEY_IN_PROGRESS: u8 = 0x04;
/// The lookup ran; response bytes can be read from the data port.
pub const SMC_STATUS_DATA_READY: u8 = 0x05;

const KEY_LEN: usize = 4;
const OSK_LEN: usize = 64;
const DATA_BUF_LEN: usize = 255;

/// Built-in OSK. Starts with `'T'` so [`register_applesmc`] can tell it has
/// not been replaced with a real key.
const PLACEHOLDER_OSK: [u8; OSK_LEN] =
    *b"THIS-OSK-IS-A-PLACEHOLDER-SET-A-REAL-64-BYTE-VALUE-BEFORE-BOOT!!";

enum RecordData {
    Bytes(&'static [u8]),
    /// A window into the controller's 64-byte OSK buffer. `OSK0`/`OSK1` are
    /// two views of the same owned buffer, so replacing the OSK retroactively
    /// changes both records.
    OskWindow { offset: usize, len: usize },
}

struct SmcRecord {
    key: [u8; KEY_LEN],
    data: RecordData,
}

/// Key table, scanned linearly in declaration order. Keys must be unique.
static RECORDS: &[SmcRecord] = &[
    SmcRecord {
        key: *b"REV ",
        data: RecordData::Bytes(&[0x01, 0x13, 0x0F, 0x00, 0x00, 0x03]),
    },
    SmcRecord {
        key: *b"OSK0",
        data: RecordData::OskWindow { offset: 0, len: 32 },
    },
    SmcRecord {
        key: *b"OSK1",
        data: RecordData::OskWindow { offset: 32, len: 32 },
    },
    SmcRecord {
        key: *b"NATJ",
        data: RecordData::Bytes(&[0x00]),
    },
    SmcRecord {
        key: *b"MSSP",
        data: RecordData::Bytes(&[0x00]),
    },
    SmcRecord {
        key: *b"MSSD",
        data: RecordData::Bytes(&[0x03]),
    },
];

/// One emulated SMC. Constructed once per machine and shared between the
/// per-port [`PortIoDevice`] wrappers; see [`register_applesmc`].
pub struct AppleSmc {
    cmd: u8,
    status: u8,
    key: [u8; KEY_LEN],
    /// Data-port writes consumed since the current command began: positions
    /// 0..4 latch key bytes, position 4 latches the requested length.
    read_pos: u8,
    data_len: u8,
    data_pos: u8,
    /// Response buffer. Deliberately not cleared between lookups: bytes past
    /// a record's length, or after a missed lookup, expose stale contents
    /// exactly like the hardware buffer does.
    data: [u8; DATA_BUF_LEN],
    osk: [u8; OSK_LEN],
}

impl AppleSmc {
    pub fn new() -> Self {
        Self {
            cmd: 0,
            status: SMC_STATUS_IDLE,
            key: [0; KEY_LEN],
            read_pos: 0,
            data_len: 0,
            data_pos: 0,
            data: [0; DATA_BUF_LEN],
            osk: PLACEHOLDER_OSK,
        }
    }

    /// Replace the OSK. Anything other than exactly 64 bytes is silently
    /// ignored.
    pub fn set_osk(&mut self, osk: &[u8]) {
        if osk.len() == OSK_LEN {
            self.osk.copy_from_slice(osk);
        }
    }

    pub fn has_placeholder_osk(&self) -> bool {
        self.osk[0] == b'T'
    }

    /// Back to power-on state. The OSK is machine configuration, not device
    /// state, and survives reset.
    pub fn reset(&mut self) {
        self.cmd = 0;
        self.status = SMC_STATUS_IDLE;
        self.key = [0; KEY_LEN];
        self.read_pos = 0;
        self.data_len = 0;
        self.data_pos = 0;
        self.data = [0; DATA_BUF_LEN];
    }

    pub fn read_port(&mut self, port: u16) -> u8 {
        if Self::is_data_port(port) {
            self.data_read()
        } else if Self::is_cmd_port(port) {
            let status = self.status;
            trace!("applesmc status read port={port:#x} status={status:#04x}");
            status
        } else {
            0
        }
    }

    pub fn write_port(&mut self, port: u16, value: u8) {
        if Self::is_data_port(port) {
            self.data_write(value);
        } else if Self::is_cmd_port(port) {
            self.cmd_write(value);
        }
    }

    fn is_data_port(port: u16) -> bool {
        (APPLESMC_DATA_PORT..APPLESMC_DATA_PORT + PORT_WIDTH).contains(&port)
    }

    fn is_cmd_port(port: u16) -> bool {
        (APPLESMC_CMD_PORT..APPLESMC_CMD_PORT + PORT_WIDTH).contains(&port)
    }

    fn cmd_write(&mut self, value: u8) {
        trace!("applesmc command write cmd={value:#04x}");
        if value == APPLESMC_READ_CMD {
            self.status = SMC_STATUS_AWAIT_KEY;
        }
        // Unknown commands are latched but have no modeled data-port behavior.
        self.cmd = value;
        self.read_pos = 0;
        self.data_pos = 0;
    }

    fn data_write(&mut self, value: u8) {
        trace!(
            "applesmc data write pos={} value={value:#04x}",
            self.read_pos
        );
        if self.cmd != APPLESMC_READ_CMD {
            // No modeled behavior outside the read command; accepted, ignored.
            return;
        }

        let pos = usize::from(self.read_pos);
        if pos < KEY_LEN {
            self.key[pos] = value;
            self.status = SMC_STATUS_KEY_IN_PROGRESS;
        } else if pos == KEY_LEN {
            self.data_len = value;
            self.data_pos = 0;
            self.status = SMC_STATUS_DATA_READY;
            trace!(
                "applesmc key complete key={} len={value}",
                String::from_utf8_lossy(&self.key)
            );
            self.fill_data();
        }
        // Writes past the length byte fall through with no effect, but the
        // cursor still advances (and wraps, like the 8-bit hardware counter).
        self.read_pos = self.read_pos.wrapping_add(1);
    }

    fn data_read(&mut self) -> u8 {
        if self.cmd != APPLESMC_READ_CMD || self.data_pos >= self.data_len {
            trace!("applesmc data read with no bytes pending");
            return 0;
        }

        let value = self.data[usize::from(self.data_pos)];
        self.data_pos += 1;
        self.status = if self.data_pos == self.data_len {
            SMC_STATUS_IDLE
        } else {
            SMC_STATUS_DATA_READY
        };
        trace!(
            "applesmc data read pos={} value={value:#04x}",
            self.data_pos - 1
        );
        value
    }

    /// Linear scan of the key table; the first exact match fills the response
    /// buffer. A miss leaves the buffer untouched.
    fn fill_data(&mut self) {
        for rec in RECORDS {
            if rec.key != self.key {
                continue;
            }
            let bytes: &[u8] = match &rec.data {
                RecordData::Bytes(bytes) => bytes,
                RecordData::OskWindow { offset, len } => &self.osk[*offset..*offset + *len],
            };
            let n = bytes.len().min(DATA_BUF_LEN);
            self.data[..n].copy_from_slice(&bytes[..n]);
            trace!(
                "applesmc key matched key={} len={n}",
                String::from_utf8_lossy(&rec.key)
            );
            return;
        }
        trace!(
            "applesmc key not found key={}",
            String::from_utf8_lossy(&self.key)
        );
    }
}

impl Default for AppleSmc {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to one SMC instance, for host-side OSK configuration.
pub type SharedAppleSmc = Rc<RefCell<AppleSmc>>;

struct AppleSmcPort {
    smc: SharedAppleSmc,
}

impl PortIoDevice for AppleSmcPort {
    fn read(&mut self, port: u16, size: u8) -> u32 {
        if size == 0 {
            return 0;
        }
        let byte = self.smc.borrow_mut().read_port(port);
        // Single-byte registers; wider reads see the byte on every lane.
        match size {
            1 => u32::from(byte),
            2 => u32::from(u16::from_le_bytes([byte, byte])),
            _ => u32::from_le_bytes([byte, byte, byte, byte]),
        }
    }

    fn write(&mut self, port: u16, size: u8, value: u32) {
        if size == 0 {
            return;
        }
        self.smc.borrow_mut().write_port(port, (value & 0xFF) as u8);
    }

    fn reset(&mut self) {
        self.smc.borrow_mut().reset();
    }
}

/// Register `smc`'s data and command port handlers on `bus`.
pub fn register_applesmc(bus: &mut IoPortBus, smc: SharedAppleSmc) {
    if smc.borrow().has_placeholder_osk() {
        warn!("AppleSMC OSK is still the built-in placeholder; OS X guests will fail SMC authentication");
    }
    for base in [APPLESMC_DATA_PORT, APPLESMC_CMD_PORT] {
        bus.register_shared_range(base, PORT_WIDTH, {
            let smc = smc.clone();
            move |_port| Box::new(AppleSmcPort { smc: smc.clone() })
        });
    }
}
