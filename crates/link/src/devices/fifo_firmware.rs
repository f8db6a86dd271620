//! Burst-FIFO firmware model.
//!
//! Follows the host-state lines through a transaction:
//! 1. **Command:** Collects four header words and decodes them.
//! 2. **Transfer count:** Records each window size; for reads, loads that many words from storage.
//! 3. **Read data:** Presents one word on `DataOut` with ready high, popping it on an `ACK` edge.
//! 4. **Write data:** Accepts one word per write-enable edge while ready is high.
//! 5. **Ack:** Presents the two ack words, carrying the checksum over every word moved.
//!
//! A change of host state takes effect on the next edge, and strobes on that edge are ignored.
//! Holding `ResetN` low returns the firmware to idle; register contents survive.
//! Per-terminal [`FifoFault`]s corrupt the ack or starve the handshake.

use std::collections::{HashMap, VecDeque};

use tracing::{trace, warn};

use crate::bus::{BusHandle, Control, HostState, Signal};
use crate::common::RegisterAddr;
use crate::common::constants::ACK_ID;
use crate::protocol::codec::{
    AckPacket, Checksum, CodecError, CommandHeader, HEADER_WORDS, Opcode,
};

use super::TICKS_PER_CYCLE;
use super::pins::Pins;
use super::storage::RegisterStore;

/// Ack status reported after a header that failed to decode.
pub const BAD_HEADER_STATUS: u16 = 0x00E1;

/// Misbehavior injected for one terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FifoFault {
    /// Replaces the ack identifier.
    pub ack_id: Option<u16>,
    /// Nonzero status reported in the ack.
    pub status: u16,
    /// XORed into the ack checksum.
    pub checksum_xor: u16,
    /// Holds ready low in the data and ack states.
    pub never_ready: bool,
    /// Cycles ready stays low after each payload word.
    pub gap: u32,
}

/// FIFO firmware behind the ready/valid pins.
#[derive(Debug)]
pub struct FifoDevice {
    pins: Pins,
    store: RegisterStore,
    cycles: u64,
    ticks_per_cycle: u64,
    state: HostState,
    header_words: Vec<u32>,
    header: Option<CommandHeader>,
    header_error: Option<CodecError>,
    cursor: RegisterAddr,
    outbound: VecDeque<u32>,
    write_remaining: u32,
    checksum: Checksum,
    next_ready: u64,
    transfer_counts: Vec<u32>,
    headers: Vec<CommandHeader>,
    faults: HashMap<u16, FifoFault>,
}

impl FifoDevice {
    /// Creates an idle device with empty registers.
    pub fn new() -> Self {
        Self {
            pins: Pins::new(),
            store: RegisterStore::new(),
            cycles: 0,
            ticks_per_cycle: TICKS_PER_CYCLE,
            state: HostState::Idle,
            header_words: Vec::with_capacity(HEADER_WORDS),
            header: None,
            header_error: None,
            cursor: RegisterAddr::new(0, 0),
            outbound: VecDeque::new(),
            write_remaining: 0,
            checksum: Checksum::new(),
            next_ready: 0,
            transfer_counts: Vec::new(),
            headers: Vec::new(),
            faults: HashMap::new(),
        }
    }

    /// Installs `fault` for every transaction on `terminal`.
    pub fn inject(&mut self, terminal: u16, fault: FifoFault) {
        let _ = self.faults.insert(terminal, fault);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Returns the register contents.
    pub const fn store(&self) -> &RegisterStore {
        &self.store
    }

    /// Returns the register contents mutably, for preloading.
    pub const fn store_mut(&mut self) -> &mut RegisterStore {
        &mut self.store
    }

    /// Returns every transfer count received, oldest first.
    pub fn transfer_counts(&self) -> &[u32] {
        &self.transfer_counts
    }

    /// Returns every command header decoded, oldest first.
    pub fn headers(&self) -> &[CommandHeader] {
        &self.headers
    }

    /// Returns the current firmware state.
    pub const fn state(&self) -> HostState {
        self.state
    }

    /// Returns the number of host signal writes so far.
    pub const fn signal_writes(&self) -> u64 {
        self.pins.host_writes()
    }

    /// Returns the elapsed clock cycles.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    fn fault(&self) -> FifoFault {
        self.header
            .and_then(|header| self.faults.get(&header.terminal).copied())
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        self.state = HostState::Idle;
        self.header_words.clear();
        self.header = None;
        self.header_error = None;
        self.outbound.clear();
        self.write_remaining = 0;
        self.checksum = Checksum::new();
        self.next_ready = 0;
    }

    fn enter(&mut self, state: HostState) {
        trace!(from = ?self.state, to = ?state, "firmware state");
        self.state = state;
        match state {
            HostState::Idle => {
                self.outbound.clear();
                self.write_remaining = 0;
            }
            HostState::Command => {
                self.header_words.clear();
                self.header = None;
                self.header_error = None;
                self.outbound.clear();
                self.checksum = Checksum::new();
            }
            HostState::Ack => {
                let fault = self.fault();
                let status = if self.header_error.is_some() {
                    BAD_HEADER_STATUS
                } else {
                    fault.status
                };
                let ack = AckPacket {
                    id: fault.ack_id.unwrap_or(ACK_ID),
                    checksum: self.checksum.value() ^ fault.checksum_xor,
                    status,
                    reserved: 0,
                };
                self.outbound.clear();
                self.outbound.extend(ack.to_words());
            }
            HostState::ReadData | HostState::WriteData | HostState::TransferCount => {}
        }
    }

    fn accept_header_word(&mut self, word: u32) {
        self.header_words.push(word);
        if self.header_words.len() < HEADER_WORDS {
            return;
        }

        let mut raw = [0u32; HEADER_WORDS];
        raw.copy_from_slice(&self.header_words);
        match CommandHeader::from_words(&raw) {
            Ok(header) => {
                trace!(?header, "header");
                self.cursor = RegisterAddr::new(header.terminal, header.reg_addr);
                self.header = Some(header);
                self.headers.push(header);
            }
            Err(err) => {
                warn!(%err, "rejecting command header");
                self.header_error = Some(err);
            }
        }
    }

    fn accept_count(&mut self, count: u32) {
        self.transfer_counts.push(count);
        let Some(header) = self.header else {
            return;
        };
        match header.opcode {
            Opcode::Read => {
                self.outbound.clear();
                self.outbound.extend(self.store.dump(self.cursor, count));
                self.cursor = self.cursor.offset(count);
            }
            Opcode::Write => self.write_remaining = count,
        }
    }

    fn update_outputs(&mut self) {
        let fault = self.fault();
        let paced = self.cycles >= self.next_ready;
        let ready = match self.state {
            HostState::Idle => false,
            HostState::Command | HostState::TransferCount => true,
            HostState::ReadData => !fault.never_ready && paced && !self.outbound.is_empty(),
            HostState::WriteData => !fault.never_ready && paced && self.write_remaining > 0,
            HostState::Ack => !fault.never_ready && !self.outbound.is_empty(),
        };
        self.pins.drive(Signal::Ready, u32::from(ready));
        self.pins
            .drive(Signal::DataOut, self.outbound.front().copied().unwrap_or(0));
    }

    fn clock(&mut self) {
        self.cycles += 1;

        if !self.pins.is_high(Signal::ResetN) {
            self.reset();
            self.update_outputs();
            return;
        }

        let requested =
            HostState::from_u32(self.pins.get(Signal::HostState)).unwrap_or(HostState::Idle);
        if requested != self.state {
            self.enter(requested);
            self.update_outputs();
            return;
        }

        let ready = self.pins.is_high(Signal::Ready);
        let control = self.pins.get(Signal::Control);
        let strobe = self.pins.is_high(Signal::WriteEnable) && ready;
        let data_in = self.pins.get(Signal::DataIn);

        match self.state {
            HostState::Idle => {}
            HostState::Command => {
                if strobe && control & Control::RDWR != 0 {
                    self.accept_header_word(data_in);
                }
            }
            HostState::TransferCount => {
                if strobe && control & Control::RDWR != 0 {
                    self.accept_count(data_in);
                }
            }
            HostState::ReadData | HostState::Ack => {
                if ready && control & Control::ACK != 0 {
                    if let Some(word) = self.outbound.pop_front() {
                        if self.state == HostState::ReadData {
                            self.checksum.push(word);
                            self.next_ready = self.cycles + u64::from(self.fault().gap);
                        }
                    }
                }
            }
            HostState::WriteData => {
                if strobe && self.write_remaining > 0 {
                    self.store.write(self.cursor, data_in);
                    self.cursor = self.cursor.next();
                    self.checksum.push(data_in);
                    self.write_remaining -= 1;
                    self.next_ready = self.cycles + u64::from(self.fault().gap);
                }
            }
        }

        self.update_outputs();
    }
}

impl Default for FifoDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl BusHandle for FifoDevice {
    fn read(&self, signal: Signal) -> u32 {
        self.pins.get(signal)
    }

    fn write(&mut self, signal: Signal, value: u32) {
        self.pins.host_write(signal, value);
    }

    fn advance(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    fn now(&self) -> u64 {
        self.cycles * self.ticks_per_cycle
    }
}
