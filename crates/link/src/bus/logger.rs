//! Bus logging decorator.
//!
//! `BusLogger` wraps any [`BusHandle`] and emits a `trace` event for every line the host
//! drives, plus one per clock advance. Reads pass through silently; sampling happens every
//! cycle and would drown the log.

use tracing::trace;

use super::signal::Signal;
use super::traits::BusHandle;

/// Traces host-driven signal writes on the wrapped bus.
#[derive(Debug)]
pub struct BusLogger<B> {
    /// The wrapped bus.
    pub bus: B,
    name: &'static str,
    writes: u64,
}

impl<B: BusHandle> BusLogger<B> {
    /// Wraps `bus`, tagging trace events with `name`.
    pub const fn new(bus: B, name: &'static str) -> Self {
        Self {
            bus,
            name,
            writes: 0,
        }
    }

    /// Returns the number of signal writes seen so far.
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    /// Unwraps the logger, returning the inner bus.
    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: BusHandle> BusHandle for BusLogger<B> {
    fn read(&self, signal: Signal) -> u32 {
        self.bus.read(signal)
    }

    fn write(&mut self, signal: Signal, value: u32) {
        self.writes += 1;
        trace!(
            bus = self.name,
            t = self.bus.now(),
            "{signal} <- {value:#x}"
        );
        self.bus.write(signal, value);
    }

    fn advance(&mut self, cycles: u32) {
        trace!(bus = self.name, t = self.bus.now(), cycles, "advance");
        self.bus.advance(cycles);
    }

    fn now(&self) -> u64 {
        self.bus.now()
    }
}
