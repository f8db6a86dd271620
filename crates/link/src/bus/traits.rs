//! Bus handle trait for clock-stepped hardware models.
//!
//! This module defines the `BusHandle` trait the protocol engine drives. It provides:
//! 1. **Access:** Read and write of named signal lines (`read`, `write`, `set`, `is_high`).
//! 2. **Clock:** `advance`, which steps the model a whole number of clock cycles.
//! 3. **Time:** `now`, the simulated time source that transaction deadlines are measured against.
//!
//! Writes are sampled by the model on the next clock edge; reads return the line values
//! after the most recent edge. The trait is object safe so transports take `&mut dyn BusHandle`.

use super::signal::Signal;

/// Signal-level handle to a simulated device.
pub trait BusHandle {
    /// Returns the current value of `signal`.
    fn read(&self, signal: Signal) -> u32;

    /// Drives `signal` to `value`; takes effect at the next clock edge.
    fn write(&mut self, signal: Signal, value: u32);

    /// Steps the model by `cycles` full clock cycles.
    fn advance(&mut self, cycles: u32);

    /// Returns the current simulated time in ticks.
    fn now(&self) -> u64;

    /// Returns `true` if `signal` is nonzero.
    fn is_high(&self, signal: Signal) -> bool {
        self.read(signal) != 0
    }

    /// Drives a single-bit line high or low.
    fn set(&mut self, signal: Signal, level: bool) {
        self.write(signal, u32::from(level));
    }
}

impl<B: BusHandle + ?Sized> BusHandle for &mut B {
    fn read(&self, signal: Signal) -> u32 {
        (**self).read(signal)
    }

    fn write(&mut self, signal: Signal, value: u32) {
        (**self).write(signal, value);
    }

    fn advance(&mut self, cycles: u32) {
        (**self).advance(cycles);
    }

    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<B: BusHandle + ?Sized> BusHandle for Box<B> {
    fn read(&self, signal: Signal) -> u32 {
        (**self).read(signal)
    }

    fn write(&mut self, signal: Signal, value: u32) {
        (**self).write(signal, value);
    }

    fn advance(&mut self, cycles: u32) {
        (**self).advance(cycles);
    }

    fn now(&self) -> u64 {
        (**self).now()
    }
}
