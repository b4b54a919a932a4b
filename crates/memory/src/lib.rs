#![forbid(unsafe_code)]

pub mod bus;
pub mod phys;
pub mod sg;

pub use bus::{MmioHandler, PhysicalMemoryBus};
pub use phys::{DenseMemory, GuestMemory, GuestMemoryError, GuestMemoryResult};
pub use sg::SgSegment;

#[cfg(test)]
mod tests;
