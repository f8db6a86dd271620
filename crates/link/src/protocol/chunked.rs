//! Chunked transfer engine.
//!
//! Bulk transfers are split into windows no larger than the firmware's burst buffer. Before
//! every window the transport is told the window size, then the window's words are moved,
//! and once every window is through the transport validates the transaction against the
//! checksum accumulated here.
//!
//! Failures are not rolled back: read windows are filled in place, so the caller's buffer
//! keeps whatever prefix arrived. The transport's `abort` runs before the error propagates.

use tracing::{debug, trace};

use crate::bus::BusHandle;
use crate::common::{RegisterAddr, UsbCommError, WORD_BYTES};
use crate::transport::WordTransport;

use super::codec::{Checksum, CommandHeader, Opcode};
use super::timeout::Deadline;

/// Payload of a bulk transfer; the variant selects the direction.
#[derive(Debug)]
pub enum TransferIo<'a> {
    /// Words are read from the device into the slice.
    Read(&'a mut [u32]),
    /// Words are written from the slice to the device.
    Write(&'a [u32]),
}

impl TransferIo<'_> {
    /// Returns the number of words to move.
    pub const fn len(&self) -> usize {
        match self {
            Self::Read(words) => words.len(),
            Self::Write(words) => words.len(),
        }
    }

    /// Returns `true` if there is nothing to move.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the command opcode for this direction.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Read(_) => Opcode::Read,
            Self::Write(_) => Opcode::Write,
        }
    }
}

/// Splits bulk transfers into burst windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkedEngine {
    burst_words: usize,
}

impl ChunkedEngine {
    /// Creates an engine with windows of at most `burst_words` words (at least one).
    pub fn new(burst_words: u32) -> Self {
        Self {
            burst_words: burst_words.max(1) as usize,
        }
    }

    /// Returns the window size in words.
    pub const fn burst_words(&self) -> usize {
        self.burst_words
    }

    /// Runs one transaction against `addr` through `transport`.
    ///
    /// A zero-length transfer succeeds without touching the bus.
    ///
    /// # Errors
    ///
    /// Any transport failure; the transport is aborted first.
    pub fn transfer(
        &self,
        transport: &mut dyn WordTransport,
        bus: &mut dyn BusHandle,
        addr: RegisterAddr,
        io: TransferIo<'_>,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        if io.is_empty() {
            return Ok(());
        }
        let length = transfer_length(io.len())?;

        let result = self.run(transport, bus, addr, io, length, deadline);
        if let Err(err) = &result {
            debug!(%addr, kind = ?transport.kind(), %err, "aborting transfer");
            transport.abort(bus);
        }
        result
    }

    fn run(
        &self,
        transport: &mut dyn WordTransport,
        bus: &mut dyn BusHandle,
        addr: RegisterAddr,
        mut io: TransferIo<'_>,
        length: u32,
        deadline: Deadline,
    ) -> Result<(), UsbCommError> {
        let total = io.len();
        let header = CommandHeader::new(io.opcode(), addr.terminal, addr.reg, length);
        transport.begin(bus, &header, deadline)?;

        let mut checksum = Checksum::new();
        let mut moved = 0usize;
        while moved < total {
            let window = self.burst_words.min(total - moved);
            let range = moved..moved + window;
            trace!(%addr, offset = moved, window, "window");

            transport.set_window(bus, window as u32, deadline)?;
            match &mut io {
                TransferIo::Read(words) => {
                    let slice = &mut words[range];
                    transport.read_window(bus, slice, deadline)?;
                    checksum.extend_words(slice);
                }
                TransferIo::Write(words) => {
                    let slice = &words[range];
                    transport.write_window(bus, slice, deadline)?;
                    checksum.extend_words(slice);
                }
            }
            moved += window;
        }

        transport.finish(bus, checksum, deadline)
    }
}

/// Byte length of a `words`-word transfer as carried in the command header.
fn transfer_length(words: usize) -> Result<u32, UsbCommError> {
    words
        .checked_mul(WORD_BYTES)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .ok_or(UsbCommError::TransferTooLong { words })
}
