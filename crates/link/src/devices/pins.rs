//! Pin table.
//!
//! Holds the current value of every [`Signal`] and counts host writes, so tests can assert
//! that an operation never touched the bus.

use crate::bus::Signal;

/// Current line values of a device model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pins {
    values: [u32; Signal::ALL.len()],
    host_writes: u64,
}

impl Pins {
    /// Creates a pin table with every line low except `ResetN` (reset released).
    pub fn new() -> Self {
        let mut values = [0; Signal::ALL.len()];
        values[Signal::ResetN.index()] = 1;
        Self {
            values,
            host_writes: 0,
        }
    }

    /// Returns the value of `signal`.
    #[inline]
    pub const fn get(&self, signal: Signal) -> u32 {
        self.values[signal.index()]
    }

    /// Returns `true` if `signal` is nonzero.
    #[inline]
    pub const fn is_high(&self, signal: Signal) -> bool {
        self.get(signal) != 0
    }

    /// Records a host write. Writes to device-driven lines are counted but ignored.
    pub const fn host_write(&mut self, signal: Signal, value: u32) {
        self.host_writes += 1;
        if !signal.is_device_driven() {
            self.values[signal.index()] = value;
        }
    }

    /// Drives a line from the device side.
    #[inline]
    pub const fn drive(&mut self, signal: Signal, value: u32) {
        self.values[signal.index()] = value;
    }

    /// Returns the number of host writes so far.
    pub const fn host_writes(&self) -> u64 {
        self.host_writes
    }
}

impl Default for Pins {
    fn default() -> Self {
        Self::new()
    }
}
