//! Transaction API.
//!
//! `Link` owns a bus handle and exposes the four transaction verbs (`get`, `set`,
//! `block_read`, `block_write`) plus clock and reset helpers. Each transaction:
//! 1. **Routes:** Picks the word transport serving the terminal.
//! 2. **Short-circuits:** Answers the firmware-version shim and companion terminals without bus traffic.
//! 3. **Times:** Converts the caller timeout into one deadline for the whole transaction.
//! 4. **Transfers:** Runs the chunked engine and reports a typed result.
//!
//! Every transaction takes `&mut self`, so only one can be in flight per bus.

use tracing::{debug, warn};

use crate::bus::{BusHandle, Signal};
use crate::common::{RegisterAddr, UsbCommError, WORD_BYTES};
use crate::config::{LinkConfig, TransportKind};
use crate::protocol::chunked::{ChunkedEngine, TransferIo};
use crate::protocol::handshake::Handshake;
use crate::protocol::timeout::compute_deadline;
use crate::transport::{FifoTransport, RegisterTransport, WordTransport};

/// Cycles `ResetN` is held low by [`Link::power_on_reset`].
const RESET_HOLD_CYCLES: u32 = 2;

/// Cycles idled after releasing reset.
const RESET_SETTLE_CYCLES: u32 = 50;

/// Transaction front end over a bus handle.
///
/// # Examples
///
/// ```
/// use simlink_core::devices::FifoDevice;
/// use simlink_core::{Link, LinkConfig};
///
/// let mut link = Link::new(FifoDevice::new(), LinkConfig::default());
/// link.power_on_reset();
///
/// link.set(1, 10, 0xab, 0).unwrap();
/// assert_eq!(link.get(1, 10, 0).unwrap(), 0xab);
/// assert_eq!(link.get(6, 4, 0).unwrap(), 512);
/// ```
#[derive(Debug)]
pub struct Link<B> {
    bus: B,
    config: LinkConfig,
    register: RegisterTransport,
    fifo: FifoTransport,
    engine: ChunkedEngine,
}

impl<B: BusHandle> Link<B> {
    /// Creates a link driving `bus` with `config`.
    pub fn new(bus: B, config: LinkConfig) -> Self {
        let handshake = Handshake::new(config.handshake_cycle_budget, config.drain_cycles);
        Self {
            register: RegisterTransport::new(config.register),
            fifo: FifoTransport::new(config.fifo, handshake),
            engine: ChunkedEngine::new(config.burst_words),
            bus,
            config,
        }
    }

    /// Returns the bus handle.
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Returns the bus handle mutably.
    pub const fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consumes the link, returning the bus handle.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Returns the active configuration.
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Returns the current simulated time in ticks.
    pub fn now(&self) -> u64 {
        self.bus.now()
    }

    /// Lets the clock run for `cycles` cycles with no transaction in flight.
    pub fn advance(&mut self, cycles: u32) {
        self.bus.advance(cycles);
    }

    /// Pulses the active-low reset and waits for the device to settle.
    pub fn power_on_reset(&mut self) {
        debug!("power-on reset");
        self.bus.set(Signal::ResetN, false);
        self.bus.advance(RESET_HOLD_CYCLES);
        self.bus.set(Signal::ResetN, true);
        self.bus.advance(RESET_SETTLE_CYCLES);
    }

    /// Sets the handshake cycle budget used by the FIFO transport.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCycleBudget` for zero.
    pub fn set_cycle_budget(&mut self, cycles: u32) -> Result<(), UsbCommError> {
        if cycles == 0 {
            return Err(UsbCommError::InvalidCycleBudget);
        }
        self.config.handshake_cycle_budget = cycles;
        self.fifo.set_cycle_budget(cycles);
        Ok(())
    }

    /// Reads one register, returning its low 16 bits.
    ///
    /// The firmware-version shim answers without touching the bus; companion terminals on
    /// the register transport read as zero.
    ///
    /// # Errors
    ///
    /// Any transaction failure.
    pub fn get(&mut self, terminal: u16, reg: u32, timeout: u32) -> Result<u16, UsbCommError> {
        if let Some(value) = self.config.shimmed_value(terminal, reg) {
            debug!(terminal, reg, value, "firmware version shim");
            return Ok(value);
        }
        if self.is_bypassed(terminal) {
            debug!(terminal, reg, "companion terminal bypassed");
            return Ok(0);
        }

        let mut word = [0u32; 1];
        self.transfer(
            RegisterAddr::new(terminal, reg),
            TransferIo::Read(&mut word),
            timeout,
        )?;
        Ok(word[0] as u16)
    }

    /// Writes one register.
    ///
    /// # Errors
    ///
    /// Any transaction failure.
    pub fn set(
        &mut self,
        terminal: u16,
        reg: u32,
        value: u16,
        timeout: u32,
    ) -> Result<(), UsbCommError> {
        if self.is_bypassed(terminal) {
            debug!(terminal, reg, "companion terminal bypassed");
            return Ok(());
        }
        let word = [u32::from(value)];
        self.transfer(
            RegisterAddr::new(terminal, reg),
            TransferIo::Write(&word),
            timeout,
        )
    }

    /// Fills `buffer` from consecutive registers starting at `reg`, little-endian.
    ///
    /// On failure `buffer` keeps the words received before it.
    ///
    /// # Errors
    ///
    /// `UnalignedLength` if `buffer` is not a whole number of words, otherwise any
    /// transaction failure.
    pub fn block_read(
        &mut self,
        terminal: u16,
        reg: u32,
        buffer: &mut [u8],
        timeout: u32,
    ) -> Result<(), UsbCommError> {
        check_aligned(buffer.len())?;
        if self.is_bypassed(terminal) {
            debug!(terminal, reg, "companion terminal bypassed");
            return Ok(());
        }

        let mut words = bytes_to_words(buffer);
        let result = self.transfer(
            RegisterAddr::new(terminal, reg),
            TransferIo::Read(&mut words),
            timeout,
        );
        for (chunk, word) in buffer.chunks_exact_mut(WORD_BYTES).zip(&words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        result
    }

    /// Writes `buffer` to consecutive registers starting at `reg`, little-endian.
    ///
    /// # Errors
    ///
    /// `UnalignedLength` if `buffer` is not a whole number of words, otherwise any
    /// transaction failure.
    pub fn block_write(
        &mut self,
        terminal: u16,
        reg: u32,
        buffer: &[u8],
        timeout: u32,
    ) -> Result<(), UsbCommError> {
        check_aligned(buffer.len())?;
        if self.is_bypassed(terminal) {
            debug!(terminal, reg, "companion terminal bypassed");
            return Ok(());
        }

        let words = bytes_to_words(buffer);
        self.transfer(
            RegisterAddr::new(terminal, reg),
            TransferIo::Write(&words),
            timeout,
        )
    }

    /// Reads `count` consecutive registers as words.
    ///
    /// # Errors
    ///
    /// Any transaction failure.
    pub fn read_words(
        &mut self,
        terminal: u16,
        reg: u32,
        count: usize,
        timeout: u32,
    ) -> Result<Vec<u32>, UsbCommError> {
        let mut words = vec![0u32; count];
        if self.is_bypassed(terminal) {
            debug!(terminal, reg, "companion terminal bypassed");
            return Ok(words);
        }
        self.transfer(
            RegisterAddr::new(terminal, reg),
            TransferIo::Read(&mut words),
            timeout,
        )?;
        Ok(words)
    }

    fn is_bypassed(&self, terminal: u16) -> bool {
        self.config.transport_for(terminal) == TransportKind::Register
            && self.config.is_bypassed(terminal)
    }

    fn transfer(
        &mut self,
        addr: RegisterAddr,
        io: TransferIo<'_>,
        timeout: u32,
    ) -> Result<(), UsbCommError> {
        let start = self.bus.now();
        let deadline = compute_deadline(timeout, start, self.config.time_scale);
        let kind = self.config.transport_for(addr.terminal);
        let opcode = io.opcode();
        let words = io.len();
        debug!(%addr, %opcode, words, ?kind, %deadline, "transaction start");

        let transport: &mut dyn WordTransport = match kind {
            TransportKind::Register => &mut self.register,
            TransportKind::Fifo => &mut self.fifo,
        };
        let result = self
            .engine
            .transfer(transport, &mut self.bus, addr, io, deadline);

        let elapsed = self.bus.now().saturating_sub(start);
        match &result {
            Ok(()) => debug!(%addr, %opcode, words, elapsed, "transaction complete"),
            Err(err) => warn!(%addr, %opcode, words, elapsed, %err, "transaction failed"),
        }
        result
    }
}

fn check_aligned(len: usize) -> Result<(), UsbCommError> {
    if len % WORD_BYTES == 0 {
        Ok(())
    } else {
        Err(UsbCommError::UnalignedLength { len })
    }
}

fn bytes_to_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(WORD_BYTES)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
