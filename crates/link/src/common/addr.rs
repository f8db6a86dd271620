//! Terminal and register addressing.
//!
//! A transaction targets one register inside one terminal. Bulk transfers walk the
//! register space one 32-bit word at a time, so the address type knows how to step.

use std::fmt;

/// A register address inside a terminal's register space.
///
/// Terminals are 16-bit endpoint selectors; register addresses are 32 bits wide and
/// are word-granular (one increment per transferred 32-bit word).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterAddr {
    /// Terminal (device/endpoint) selector.
    pub terminal: u16,
    /// Register address within the terminal.
    pub reg: u32,
}

impl RegisterAddr {
    /// Creates a new address from a terminal and register pair.
    #[inline]
    pub const fn new(terminal: u16, reg: u32) -> Self {
        Self { terminal, reg }
    }

    /// Returns the address `words` registers further on, wrapping at 32 bits.
    #[inline]
    pub const fn offset(self, words: u32) -> Self {
        Self {
            terminal: self.terminal,
            reg: self.reg.wrapping_add(words),
        }
    }

    /// Returns the next register address.
    #[inline]
    pub const fn next(self) -> Self {
        self.offset(1)
    }
}

impl fmt::Display for RegisterAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#x}", self.terminal, self.reg)
    }
}
