//! Common types and constants shared by the protocol engine and the device models.
//!
//! This module provides the small building blocks used across the crate:
//! 1. **Addresses:** A terminal/register address pair with word-stepping helpers.
//! 2. **Constants:** Wire constants (magic ids, prefixes, burst sizes, legacy shims).
//! 3. **Error Handling:** The transaction error taxonomy surfaced to callers.

/// Terminal/register address type.
pub mod addr;

/// Wire and timing constants.
pub mod constants;

/// Transaction error types.
pub mod error;

pub use addr::RegisterAddr;
pub use constants::{ACK_ID, BURST_BUFFER_BYTES, BURST_WORDS, WORD_BYTES};
pub use error::{UsbCommError, WaitTarget};
