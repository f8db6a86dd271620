//! Register storage.
//!
//! Sparse word storage keyed by terminal and register address. Unwritten registers read
//! as zero.

use std::collections::HashMap;

use crate::common::RegisterAddr;

/// Sparse register contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterStore {
    regs: HashMap<RegisterAddr, u32>,
}

impl RegisterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one register.
    pub fn read(&self, addr: RegisterAddr) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Writes one register.
    pub fn write(&mut self, addr: RegisterAddr, value: u32) {
        let _ = self.regs.insert(addr, value);
    }

    /// Writes `words` to consecutive registers starting at `addr`.
    pub fn load(&mut self, addr: RegisterAddr, words: &[u32]) {
        for (offset, &word) in (0u32..).zip(words) {
            self.write(addr.offset(offset), word);
        }
    }

    /// Reads `count` consecutive registers starting at `addr`.
    pub fn dump(&self, addr: RegisterAddr, count: u32) -> Vec<u32> {
        (0..count).map(|offset| self.read(addr.offset(offset))).collect()
    }

    /// Returns the number of registers ever written.
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Forgets every register.
    pub fn clear(&mut self) {
        self.regs.clear();
    }
}
