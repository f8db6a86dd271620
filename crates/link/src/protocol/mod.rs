//! Protocol engine.
//!
//! This module holds the transport-independent parts of a transaction:
//! 1. **Timeout Clock:** Deadline arithmetic and the single clock-advance suspension point.
//! 2. **Packet Codec:** Command headers, acknowledgment packets, and the payload checksum.
//! 3. **Handshake:** The ready/valid burst state machine used by the FIFO transport.
//! 4. **Chunked Transfers:** The windowed bulk-transfer loop shared by both transports.

/// Windowed bulk-transfer engine.
pub mod chunked;

/// Command header and acknowledgment packet codec.
pub mod codec;

/// Ready/valid burst handshake.
pub mod handshake;

/// Deadline arithmetic and clock stepping.
pub mod timeout;

pub use chunked::{ChunkedEngine, TransferIo};
pub use codec::{AckFailure, AckPacket, Checksum, CodecError, CommandHeader, Opcode};
pub use handshake::{Handshake, HandshakeState};
pub use timeout::{Deadline, compute_deadline, is_expired};
