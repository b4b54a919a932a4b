use std::collections::HashMap;

pub trait PortIoDevice {
    fn read(&mut self, port: u16, size: u8) -> u32;
    fn write(&mut self, port: u16, size: u8, value: u32);

    /// Reset the device back to its power-on state.
    fn reset(&mut self) {}
}

/// Exact-port x86 I/O port dispatch.
///
/// Devices register byte-granularity handlers per port; multi-port devices
/// typically register one thin wrapper per port over a shared
/// `Rc<RefCell<...>>` controller (see [`Self::register_shared_range`]).
pub struct IoPortBus {
    devices: HashMap<u16, Box<dyn PortIoDevice>>,
}

impl IoPortBus {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    pub fn register(&mut self, port: u16, device: Box<dyn PortIoDevice>) {
        self.devices.insert(port, device);
    }

    /// Unregister an I/O port handler, returning the removed device (if any).
    pub fn unregister(&mut self, port: u16) -> Option<Box<dyn PortIoDevice>> {
        self.devices.remove(&port)
    }

    /// Register a device for a contiguous range of I/O ports.
    ///
    /// The provided factory is invoked once per port. It can be used to build
    /// per-port wrapper devices that share a single underlying implementation
    /// (e.g. via `Rc<RefCell<...>>`).
    ///
    /// Ports are computed using wrapping arithmetic (`start + offset`), matching
    /// x86 I/O port semantics.
    pub fn register_shared_range<F>(&mut self, start: u16, len: u16, mut make: F)
    where
        F: FnMut(u16) -> Box<dyn PortIoDevice>,
    {
        for offset in 0..len {
            let port = start.wrapping_add(offset);
            self.register(port, make(port));
        }
    }

    pub fn read(&mut self, port: u16, size: u8) -> u32 {
        // Zero-sized accesses are not representable by the x86 ISA; treat them as true no-ops.
        if size == 0 {
            return 0;
        }

        // x86 port I/O instructions only support access sizes {1,2,4}. Treat any other non-zero
        // size as an invalid access and float the bus high rather than forwarding an unexpected
        // size into device models.
        if !matches!(size, 1 | 2 | 4) {
            return 0xFFFF_FFFF;
        }

        if let Some(dev) = self.devices.get_mut(&port) {
            return dev.read(port, size);
        }

        match size {
            1 => 0xFF,
            2 => 0xFFFF,
            _ => 0xFFFF_FFFF,
        }
    }

    pub fn write(&mut self, port: u16, size: u8, value: u32) {
        if size == 0 {
            return;
        }
        if !matches!(size, 1 | 2 | 4) {
            return;
        }
        if let Some(device) = self.devices.get_mut(&port) {
            device.write(port, size, value);
        }
    }

    pub fn read_u8(&mut self, port: u16) -> u8 {
        self.read(port, 1) as u8
    }

    pub fn write_u8(&mut self, port: u16, value: u8) {
        self.write(port, 1, value as u32);
    }

    pub fn reset(&mut self) {
        for dev in self.devices.values_mut() {
            dev.reset();
        }
    }
}

impl Default for IoPortBus {
    fn default() -> Self {
        Self::new()
    }
}
