//! Reference device models.
//!
//! Pure-software stand-ins for the two device variants, each implementing [`BusHandle`]
//! the way a clock-stepped hardware model would: host writes are sampled at the next
//! edge, device outputs change only on edges.
//! 1. **`RegisterBank`:** Direct-register device with busy latency, status faults, and the write-mode latch.
//! 2. **`FifoDevice`:** Burst-FIFO firmware that decodes headers, serves windows, and returns acks.
//! 3. **`RegisterStore`:** The register contents both models share.
//!
//! [`BusHandle`]: crate::bus::BusHandle

/// Burst-FIFO firmware model.
pub mod fifo_firmware;

/// Pin table shared by the models.
pub mod pins;

/// Direct-register device model.
pub mod register_bank;

/// Register storage.
pub mod storage;

pub use fifo_firmware::{FifoDevice, FifoFault};
pub use pins::Pins;
pub use register_bank::RegisterBank;
pub use storage::RegisterStore;

/// Simulated-time ticks per clock cycle (two half periods of 11 ticks).
pub const TICKS_PER_CYCLE: u64 = 22;
