//! Packet codec.
//!
//! This module encodes and decodes the two fixed-layout records exchanged with the FIFO
//! firmware. It provides:
//! 1. **Command Header:** 16 bytes, little-endian, sent before any payload.
//! 2. **Acknowledgment Packet:** 8 bytes, returned after the payload.
//! 3. **Checksum:** The 16-bit running sum over every payload word of a transaction.
//!
//! Header layout (byte offsets):
//!
//! | Offset | Width | Field             |
//! |--------|-------|-------------------|
//! | 0      | 2     | `0xC300 \| opcode` |
//! | 2      | 2     | buffer length     |
//! | 4      | 2     | terminal          |
//! | 6      | 2     | reserved (0)      |
//! | 8      | 4     | register address  |
//! | 12     | 4     | transfer length   |
//!
//! Ack layout: id (2), checksum (2), status (2), reserved (2).

use std::fmt;

use thiserror::Error;

use crate::common::constants::{ACK_ID, BURST_BUFFER_BYTES, COMMAND_PREFIX, WORD_BYTES};

/// Size of an encoded command header in bytes.
pub const HEADER_BYTES: usize = 16;

/// Size of an encoded command header in words.
pub const HEADER_WORDS: usize = HEADER_BYTES / WORD_BYTES;

/// Size of an acknowledgment packet in words.
pub const ACK_WORDS: usize = 2;

/// Transaction direction carried in the low byte of the command field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Device to host.
    Read = 1,
    /// Host to device.
    Write = 2,
}

impl Opcode {
    /// Decodes a raw opcode byte.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Failure to decode a command header.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The command field does not carry the `0xC3` prefix.
    #[error("bad command prefix {0:#06x}")]
    BadPrefix(u16),
    /// The opcode byte is neither read nor write.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// The transfer length is not a whole number of words.
    #[error("transfer length {0} is not word aligned")]
    UnalignedLength(u32),
}

/// Fixed-layout record that opens every FIFO transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandHeader {
    /// Transaction direction.
    pub opcode: Opcode,
    /// Buffer-length hint; always [`BURST_BUFFER_BYTES`] when built by [`CommandHeader::new`].
    pub buffer_length: u16,
    /// Target terminal.
    pub terminal: u16,
    /// First register address.
    pub reg_addr: u32,
    /// Payload length in bytes.
    pub transfer_length: u32,
}

impl CommandHeader {
    /// Builds a header. The buffer-length hint is fixed at the full burst buffer size,
    /// whatever `transfer_length` is; the firmware expects exactly that value.
    pub const fn new(opcode: Opcode, terminal: u16, reg_addr: u32, transfer_length: u32) -> Self {
        Self {
            opcode,
            buffer_length: BURST_BUFFER_BYTES,
            terminal,
            reg_addr,
            transfer_length,
        }
    }

    /// Returns the packed command field.
    pub const fn command(&self) -> u16 {
        COMMAND_PREFIX | self.opcode as u16
    }

    /// Returns the payload length in words.
    pub const fn transfer_words(&self) -> u32 {
        self.transfer_length / WORD_BYTES as u32
    }

    /// Encodes the header into its 16-byte little-endian wire form.
    pub fn encode(&self) -> [u8; HEADER_BYTES] {
        let mut bytes = [0u8; HEADER_BYTES];
        bytes[0..2].copy_from_slice(&self.command().to_le_bytes());
        bytes[2..4].copy_from_slice(&self.buffer_length.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.terminal.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.reg_addr.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.transfer_length.to_le_bytes());
        bytes
    }

    /// Returns the header as the four words written on the data lines.
    pub fn to_words(&self) -> [u32; HEADER_WORDS] {
        let bytes = self.encode();
        let mut words = [0u32; HEADER_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD_BYTES)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    /// Decodes a header from its wire form.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` for a missing prefix, an unknown opcode, or a transfer length
    /// that is not a multiple of four.
    pub fn decode(bytes: &[u8; HEADER_BYTES]) -> Result<Self, CodecError> {
        let command = u16::from_le_bytes([bytes[0], bytes[1]]);
        if command & 0xFF00 != COMMAND_PREFIX {
            return Err(CodecError::BadPrefix(command));
        }
        let raw_opcode = (command & 0x00FF) as u8;
        let opcode = Opcode::from_u8(raw_opcode).ok_or(CodecError::UnknownOpcode(raw_opcode))?;

        let transfer_length = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        if transfer_length % WORD_BYTES as u32 != 0 {
            return Err(CodecError::UnalignedLength(transfer_length));
        }

        Ok(Self {
            opcode,
            buffer_length: u16::from_le_bytes([bytes[2], bytes[3]]),
            terminal: u16::from_le_bytes([bytes[4], bytes[5]]),
            reg_addr: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            transfer_length,
        })
    }

    /// Decodes a header from the four words received on the data lines.
    ///
    /// # Errors
    ///
    /// As [`CommandHeader::decode`].
    pub fn from_words(words: &[u32; HEADER_WORDS]) -> Result<Self, CodecError> {
        let mut bytes = [0u8; HEADER_BYTES];
        for (chunk, word) in bytes.chunks_exact_mut(WORD_BYTES).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self::decode(&bytes)
    }
}

/// Encodes a command header for `length` payload bytes.
pub fn encode_command(
    opcode: Opcode,
    terminal: u16,
    reg_addr: u32,
    length: u32,
) -> [u8; HEADER_BYTES] {
    CommandHeader::new(opcode, terminal, reg_addr, length).encode()
}

/// Trailer returned by the firmware after the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AckPacket {
    /// Must equal [`ACK_ID`].
    pub id: u16,
    /// Firmware's checksum over the payload.
    pub checksum: u16,
    /// Zero on success, otherwise a device error code.
    pub status: u16,
    /// Unused.
    pub reserved: u16,
}

impl AckPacket {
    /// Builds a well-formed ack carrying `checksum` and `status`.
    pub const fn new(checksum: u16, status: u16) -> Self {
        Self {
            id: ACK_ID,
            checksum,
            status,
            reserved: 0,
        }
    }

    /// Packs the ack into its two little-endian wire words.
    pub const fn to_words(&self) -> [u32; ACK_WORDS] {
        [
            (self.id as u32) | ((self.checksum as u32) << 16),
            (self.status as u32) | ((self.reserved as u32) << 16),
        ]
    }

    /// Unpacks an ack from its two wire words.
    pub const fn from_words(words: [u32; ACK_WORDS]) -> Self {
        Self {
            id: words[0] as u16,
            checksum: (words[0] >> 16) as u16,
            status: words[1] as u16,
            reserved: (words[1] >> 16) as u16,
        }
    }
}

/// Reason an acknowledgment packet rejects the transaction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckFailure {
    /// The identifier is not [`ACK_ID`].
    #[error("bad ack id {id:#06x}")]
    BadAckId {
        /// Received identifier.
        id: u16,
    },
    /// The checksum differs from the locally computed one.
    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Locally computed checksum.
        expected: u16,
        /// Checksum carried by the ack.
        actual: u16,
    },
    /// The firmware reported a nonzero status.
    #[error("device status {code:#x}")]
    DeviceStatusError {
        /// Reported status code.
        code: u16,
    },
}

/// Validates the acknowledgment in the last two words of `raw_words`.
///
/// `checksum` is the value the caller accumulated over the payload; it is compared, not
/// recomputed. Checks run in order: identifier, checksum, status. A buffer shorter than
/// one ack reads as an all-zero packet and fails the identifier check.
///
/// # Errors
///
/// Returns the first `AckFailure` found.
pub fn decode_and_validate_ack(raw_words: &[u32], checksum: u16) -> Result<AckPacket, AckFailure> {
    let ack = match raw_words {
        [.., first, second] => AckPacket::from_words([*first, *second]),
        _ => AckPacket::from_words([0, 0]),
    };

    if ack.id != ACK_ID {
        return Err(AckFailure::BadAckId { id: ack.id });
    }
    if ack.checksum != checksum {
        return Err(AckFailure::ChecksumMismatch {
            expected: checksum,
            actual: ack.checksum,
        });
    }
    if ack.status != 0 {
        return Err(AckFailure::DeviceStatusError { code: ack.status });
    }
    Ok(ack)
}

/// 16-bit wrapping sum over 32-bit payload words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Checksum(u16);

impl Checksum {
    /// An empty checksum.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Adds one word.
    #[inline]
    pub const fn push(&mut self, word: u32) {
        self.0 = self.0.wrapping_add(word as u16);
    }

    /// Adds every word of `words`.
    pub fn extend_words(&mut self, words: &[u32]) {
        for &word in words {
            self.push(word);
        }
    }

    /// Returns the current sum.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Computes the checksum of `words` in one go.
    pub fn of(words: &[u32]) -> Self {
        let mut sum = Self::new();
        sum.extend_words(words);
        sum
    }
}
