//! Burst-FIFO transport.
//!
//! A transaction on this variant is a short conversation with the firmware, steered by the
//! host-state lines:
//! 1. **Command:** Four header words, each a ready-gated control-word write.
//! 2. **Transfer count:** The next window's word count, before every window.
//! 3. **Data:** Read windows run the burst handshake; write windows strobe one word per ready edge.
//! 4. **Ack:** A two-word handshake, validated against the locally accumulated checksum.

use tracing::trace;

use crate::bus::{BusHandle, Control, HostState, Signal};
use crate::common::{UsbCommError, WaitTarget};
use crate::config::FifoTiming;
use crate::protocol::codec::{ACK_WORDS, Checksum, CommandHeader, decode_and_validate_ack};
use crate::protocol::handshake::{Handshake, count_wait};
use crate::protocol::timeout::{Deadline, idle, step};

use super::{TransportKind, WordTransport};

/// Word transport over the ready/valid FIFO pins.
#[derive(Debug)]
pub struct FifoTransport {
    timing: FifoTiming,
    handshake: Handshake,
}

impl FifoTransport {
    /// Creates a transport with the given pin timing and handshake parameters.
    pub const fn new(timing: FifoTiming, handshake: Handshake) -> Self {
        Self { timing, handshake }
    }

    /// Returns the handshake cycle budget.
    pub const fn cycle_budget(&self) -> u32 {
        self.handshake.cycle_budget()
    }

    /// Replaces the handshake cycle budget, also used for ready-gated writes.
    pub const fn set_cycle_budget(&mut self, cycles: u32) {
        self.handshake.set_cycle_budget(cycles);
    }

    fn select(bus: &mut dyn BusHandle, state: HostState) {
        trace!(?state, "host state");
        bus.write(Signal::HostState, state.as_u32());
    }

    fn wait_ready(&self, bus: &mut dyn BusHandle, deadline: Deadline) -> Result<(), UsbCommError> {
        let mut waited = 0u32;
        while !bus.is_high(Signal::Ready) {
            step(bus, deadline, WaitTarget::Ready)?;
            waited = count_wait(waited, self.handshake.cycle_budget())?;
        }
        Ok(())
    }

    /// Writes one control word (header word or transfer count).
    fn control_write(
        &self,
        bus: &mut dyn BusHandle,
        word: u32,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        idle(bus, self.timing.setup_cycles, deadline, WaitTarget::Transfer)?;
        self.wait_ready(bus, deadline)?;

        bus.write(Signal::Control, Control::WRITE);
        bus.set(Signal::WriteEnable, true);
        bus.write(Signal::DataIn, word);
        let stepped = step(bus, deadline, WaitTarget::Transfer);
        bus.write(Signal::Control, Control::IDLE);
        bus.set(Signal::WriteEnable, false);
        stepped?;

        idle(bus, self.timing.hold_cycles, deadline, WaitTarget::Transfer)
    }
}

impl WordTransport for FifoTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Fifo
    }

    fn begin(
        &mut self,
        bus: &mut dyn BusHandle,
        header: &CommandHeader,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        Self::select(bus, HostState::Command);
        for word in header.to_words() {
            self.control_write(bus, word, deadline)?;
        }
        Ok(())
    }

    fn set_window(
        &mut self,
        bus: &mut dyn BusHandle,
        words: u32,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        Self::select(bus, HostState::TransferCount);
        self.control_write(bus, words, deadline)
    }

    fn read_window(
        &mut self,
        bus: &mut dyn BusHandle,
        out: &mut [u32],
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        Self::select(bus, HostState::ReadData);
        idle(bus, self.timing.lead_cycles, deadline, WaitTarget::Transfer)?;
        self.handshake.run(bus, out, deadline, WaitTarget::Drain)
    }

    fn write_window(
        &mut self,
        bus: &mut dyn BusHandle,
        words: &[u32],
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        Self::select(bus, HostState::WriteData);
        idle(bus, self.timing.lead_cycles, deadline, WaitTarget::Transfer)?;
        for &word in words {
            self.wait_ready(bus, deadline)?;
            bus.write(Signal::DataIn, word);
            bus.set(Signal::WriteEnable, true);
            let stepped = step(bus, deadline, WaitTarget::Transfer);
            bus.set(Signal::WriteEnable, false);
            stepped?;
        }
        Ok(())
    }

    fn finish(
        &mut self,
        bus: &mut dyn BusHandle,
        checksum: Checksum,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        Self::select(bus, HostState::Ack);
        idle(bus, self.timing.lead_cycles, deadline, WaitTarget::Ack)?;

        let mut raw = [0u32; ACK_WORDS];
        self.handshake.run(bus, &mut raw, deadline, WaitTarget::Ack)?;
        let ack = decode_and_validate_ack(&raw, checksum.value())?;
        trace!(checksum = ack.checksum, "ack ok");

        Self::select(bus, HostState::Idle);
        step(bus, deadline, WaitTarget::Ack)
    }

    fn abort(&mut self, bus: &mut dyn BusHandle) {
        Self::select(bus, HostState::Idle);
        bus.write(Signal::Control, Control::IDLE);
        bus.set(Signal::WriteEnable, false);
        bus.write(Signal::DataIn, 0);
    }
}
