//! Direct-register transport.
//!
//! Each word is one register access: pulse an enable line for one edge, let the device
//! settle, wait while it reports busy, then check the status line. Writes additionally hold
//! the write-mode latch for the whole transaction; it is dropped on every exit path, since a
//! device left with the latch high refuses subsequent reads.
//!
//! After a timeout the latch is dropped without idling, so the error surfaces within one
//! cycle of the deadline. The release cycles are owed instead and idled at the start of the
//! next transaction.
//!
//! There is no header, transfer count, or ack on this variant.

use std::mem;

use tracing::trace;

use crate::bus::{BusHandle, Signal};
use crate::common::{RegisterAddr, UsbCommError, WaitTarget};
use crate::config::RegisterTiming;
use crate::protocol::codec::{Checksum, CommandHeader, Opcode};
use crate::protocol::timeout::{Deadline, idle, step};

use super::{TransportKind, WordTransport};

/// Word transport over enable/busy/status pins.
#[derive(Debug)]
pub struct RegisterTransport {
    timing: RegisterTiming,
    cursor: RegisterAddr,
    latched: bool,
    owed_cycles: u32,
}

impl RegisterTransport {
    /// Creates a transport with the given pin timing.
    pub const fn new(timing: RegisterTiming) -> Self {
        Self {
            timing,
            cursor: RegisterAddr::new(0, 0),
            latched: false,
            owed_cycles: 0,
        }
    }

    /// Returns `true` while the write-mode latch is held.
    pub const fn is_latched(&self) -> bool {
        self.latched
    }

    /// Returns the address of the next word.
    pub const fn cursor(&self) -> RegisterAddr {
        self.cursor
    }

    /// Returns the release cycles still to be idled before the next transaction.
    pub const fn owed_cycles(&self) -> u32 {
        self.owed_cycles
    }

    fn release_latch(&mut self, bus: &mut dyn BusHandle, cycles: u32) {
        if self.latched {
            bus.set(Signal::WriteMode, false);
            bus.advance(cycles);
            self.latched = false;
        }
    }

    /// Drops the latch now and defers its release cycles to the next `begin`.
    fn drop_latch(&mut self, bus: &mut dyn BusHandle) {
        if self.latched {
            bus.set(Signal::WriteMode, false);
            self.latched = false;
            self.owed_cycles = self.timing.timeout_release_cycles;
        }
    }

    fn advance_cursor(&mut self, bus: &mut dyn BusHandle) {
        self.cursor = self.cursor.next();
        bus.write(Signal::RegAddr, self.cursor.reg);
    }

    fn pulse(bus: &mut dyn BusHandle, line: Signal, deadline: Deadline) -> Result<(), UsbCommError> {
        bus.set(line, true);
        let stepped = step(bus, deadline, WaitTarget::Transfer);
        bus.set(line, false);
        stepped
    }

    fn wait_not_busy(&self, bus: &mut dyn BusHandle, deadline: Deadline) -> Result<(), UsbCommError> {
        idle(bus, self.timing.settle_cycles, deadline, WaitTarget::Busy)?;
        while bus.is_high(Signal::Busy) {
            step(bus, deadline, WaitTarget::Busy)?;
        }
        Ok(())
    }

    fn check_status(bus: &dyn BusHandle) -> Result<(), UsbCommError> {
        match bus.read(Signal::Status) as u16 {
            0 => Ok(()),
            code => Err(UsbCommError::DeviceStatusError { code }),
        }
    }

    fn write_word(
        &mut self,
        bus: &mut dyn BusHandle,
        word: u32,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        bus.write(Signal::DataIn, word);
        Self::pulse(bus, Signal::WriteEnable, deadline)?;
        self.wait_not_busy(bus, deadline)?;
        Self::check_status(bus)?;
        self.advance_cursor(bus);
        step(bus, deadline, WaitTarget::Transfer)
    }
}

impl WordTransport for RegisterTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Register
    }

    fn begin(
        &mut self,
        bus: &mut dyn BusHandle,
        header: &CommandHeader,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        let owed = mem::take(&mut self.owed_cycles);
        idle(bus, owed, deadline, WaitTarget::Transfer)?;

        self.cursor = RegisterAddr::new(header.terminal, header.reg_addr);
        bus.write(Signal::TerminalAddr, u32::from(header.terminal));
        bus.write(Signal::RegAddr, header.reg_addr);
        if header.opcode == Opcode::Write {
            bus.set(Signal::WriteMode, true);
            self.latched = true;
        }
        step(bus, deadline, WaitTarget::Transfer)
    }

    fn set_window(
        &mut self,
        _bus: &mut dyn BusHandle,
        _words: u32,
        _deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        Ok(())
    }

    fn read_window(
        &mut self,
        bus: &mut dyn BusHandle,
        out: &mut [u32],
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        for slot in out.iter_mut() {
            Self::pulse(bus, Signal::ReadEnable, deadline)?;
            self.wait_not_busy(bus, deadline)?;
            *slot = bus.read(Signal::DataOut);
            trace!(addr = %self.cursor, value = *slot, "register read");
            self.advance_cursor(bus);
            Self::check_status(bus)?;
        }
        Ok(())
    }

    fn write_window(
        &mut self,
        bus: &mut dyn BusHandle,
        words: &[u32],
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        for &word in words {
            trace!(addr = %self.cursor, value = word, "register write");
            if let Err(err) = self.write_word(bus, word, deadline) {
                if err.is_timeout() {
                    self.drop_latch(bus);
                } else {
                    self.release_latch(bus, self.timing.write_release_cycles);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn finish(
        &mut self,
        bus: &mut dyn BusHandle,
        _checksum: Checksum,
        _deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        self.release_latch(bus, self.timing.write_release_cycles);
        Ok(())
    }

    fn abort(&mut self, bus: &mut dyn BusHandle) {
        bus.set(Signal::ReadEnable, false);
        bus.set(Signal::WriteEnable, false);
        self.drop_latch(bus);
    }
}
