//! Transaction error taxonomy.
//!
//! Every failure terminates the current transaction; nothing is retried internally.
//! This module provides:
//! 1. **`UsbCommError`:** The error returned by every transaction on the link.
//! 2. **`WaitTarget`:** What the engine was waiting on when a deadline expired.

use std::fmt;

use thiserror::Error;

use crate::protocol::codec::AckFailure;

/// The condition a timed-out wait was polling for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitTarget {
    /// Busy line still asserted on the direct-register transport.
    Busy,
    /// Ready line never asserted on the FIFO transport.
    Ready,
    /// Idle padding cycles around a control write or strobe.
    Transfer,
    /// Burst data or drain cycles inside the handshake.
    Drain,
    /// Acknowledgment packet after the payload.
    Ack,
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Busy => "busy release",
            Self::Ready => "ready",
            Self::Transfer => "transfer",
            Self::Drain => "burst drain",
            Self::Ack => "ack",
        };
        f.write_str(name)
    }
}

/// Failure of a link transaction.
///
/// The variants mirror what a physical link reports: deadlines, framing desync,
/// payload corruption, device-reported status, and handshake starvation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsbCommError {
    /// Simulated time reached the transaction deadline.
    #[error("timed out waiting for {waiting_for} (deadline {deadline})")]
    Timeout {
        /// What the engine was polling for.
        waiting_for: WaitTarget,
        /// Absolute deadline, in simulated ticks.
        deadline: u64,
    },

    /// Acknowledgment identifier did not match the reserved magic value.
    #[error("unexpected ack id {id:#06x}")]
    BadAckId {
        /// Identifier carried by the received packet.
        id: u16,
    },

    /// Checksum computed over the payload differs from the one in the ack.
    #[error("checksum mismatch: computed {expected:#06x}, ack carried {actual:#06x}")]
    ChecksumMismatch {
        /// Checksum computed locally over the transferred words.
        expected: u16,
        /// Checksum carried by the acknowledgment packet.
        actual: u16,
    },

    /// The device reported a nonzero status word.
    #[error("non-zero device status {code:#x} ({code})")]
    DeviceStatusError {
        /// Status code reported by the device.
        code: u16,
    },

    /// Ready never asserted within the handshake cycle budget.
    #[error("waited {cycles} cycles for ready")]
    HandshakeTimeout {
        /// Cycles spent waiting before giving up.
        cycles: u32,
    },

    /// Buffer length is not a whole number of 32-bit words.
    #[error("buffer length {len} is not a multiple of 4 bytes")]
    UnalignedLength {
        /// Offending length in bytes.
        len: usize,
    },

    /// Transfer length in bytes does not fit the header's 32-bit length field.
    #[error("transfer of {words} words exceeds the 32-bit byte length")]
    TransferTooLong {
        /// Requested length in words.
        words: usize,
    },

    /// A handshake cycle budget of zero was requested.
    #[error("cycle budget must be at least 1")]
    InvalidCycleBudget,
}

impl UsbCommError {
    /// Returns the device status code for `DeviceStatusError` failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::DeviceStatusError { code } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` for either kind of timeout (deadline or cycle budget).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::HandshakeTimeout { .. })
    }
}

impl From<AckFailure> for UsbCommError {
    fn from(failure: AckFailure) -> Self {
        match failure {
            AckFailure::BadAckId { id } => Self::BadAckId { id },
            AckFailure::ChecksumMismatch { expected, actual } => {
                Self::ChecksumMismatch { expected, actual }
            }
            AckFailure::DeviceStatusError { code } => Self::DeviceStatusError { code },
        }
    }
}
