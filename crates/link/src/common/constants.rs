//! Wire and Timing Constants.
//!
//! Values here are part of the device protocol and must match the simulated firmware
//! bit for bit. Tunable timing lives in [`crate::config`] instead.

/// Size of one transferred word in bytes.
pub const WORD_BYTES: usize = 4;

/// Maximum number of words the device FIFO accepts in one burst window.
pub const BURST_WORDS: u32 = 256;

/// `buffer_length` value carried in every command header.
///
/// The firmware expects the full burst buffer size here regardless of the request size.
pub const BURST_BUFFER_BYTES: u16 = (BURST_WORDS as usize * WORD_BYTES) as u16;

/// Identifier every acknowledgment packet must carry.
pub const ACK_ID: u16 = 0xA50F;

/// High byte of the `cmd` field in a command header; the opcode fills the low byte.
pub const COMMAND_PREFIX: u16 = 0xC300;

/// Simulated-time ticks per caller timeout unit.
pub const TIME_SCALE: u64 = 1_000_000;

/// Terminal answered by the firmware-version shim.
pub const FIRMWARE_VERSION_TERMINAL: u16 = 6;

/// Register answered by the firmware-version shim.
pub const FIRMWARE_VERSION_REG: u32 = 4;

/// Firmware version reported by the shim.
pub const FIRMWARE_VERSION: u16 = 512;

/// Terminals owned by the companion co-processor, answered without bus traffic on
/// the direct-register transport.
pub const COMPANION_TERMINALS: [u16; 3] = [0x100, 5, 80];
