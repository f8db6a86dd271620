//! Word transports.
//!
//! Both device variants move 32-bit words, but over different pins. This module puts them
//! behind one trait so the chunked engine drives either:
//! 1. **`RegisterTransport`:** Enable pulses, busy polling, status check, write-mode latch.
//! 2. **`FifoTransport`:** Command header, transfer counts, ready/valid bursts, ack packet.
//!
//! The transport serving a terminal is chosen by [`crate::config::LinkConfig::transport_for`].

use std::fmt;

use crate::bus::BusHandle;
use crate::common::UsbCommError;
use crate::protocol::codec::{Checksum, CommandHeader};
use crate::protocol::timeout::Deadline;

/// Burst-FIFO transport.
pub mod fifo;

/// Direct-register transport.
pub mod register;

pub use crate::config::TransportKind;
pub use fifo::FifoTransport;
pub use register::RegisterTransport;

/// One variant of the word-moving layer under the chunked engine.
///
/// The engine calls `begin` once, then `set_window` followed by `read_window` or
/// `write_window` per burst window, then `finish`. On any failure it calls `abort`,
/// which must leave the bus ready for the next transaction.
pub trait WordTransport: fmt::Debug {
    /// Returns which variant this is.
    fn kind(&self) -> TransportKind;

    /// Opens a transaction described by `header`.
    ///
    /// # Errors
    ///
    /// Timeouts while presenting the header.
    fn begin(
        &mut self,
        bus: &mut dyn BusHandle,
        header: &CommandHeader,
        deadline: Deadline,
    ) -> Result<(), UsbCommError>;

    /// Announces the size of the next window.
    ///
    /// # Errors
    ///
    /// Timeouts while writing the transfer count.
    fn set_window(
        &mut self,
        bus: &mut dyn BusHandle,
        words: u32,
        deadline: Deadline,
    ) -> Result<(), UsbCommError>;

    /// Fills `out` from the device, in place.
    ///
    /// # Errors
    ///
    /// Timeouts or device status; `out` keeps the words already received.
    fn read_window(
        &mut self,
        bus: &mut dyn BusHandle,
        out: &mut [u32],
        deadline: Deadline,
    ) -> Result<(), UsbCommError>;

    /// Sends `words` to the device.
    ///
    /// # Errors
    ///
    /// Timeouts or device status.
    fn write_window(
        &mut self,
        bus: &mut dyn BusHandle,
        words: &[u32],
        deadline: Deadline,
    ) -> Result<(), UsbCommError>;

    /// Closes the transaction, validating it against the payload `checksum`.
    ///
    /// # Errors
    ///
    /// Ack failures and timeouts.
    fn finish(
        &mut self,
        bus: &mut dyn BusHandle,
        checksum: Checksum,
        deadline: Deadline,
    ) -> Result<(), UsbCommError>;

    /// Releases every held line after a failure.
    fn abort(&mut self, bus: &mut dyn BusHandle);
}
