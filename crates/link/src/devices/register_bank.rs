//! Direct-register device model.
//!
//! Behaves like a register bridge behind enable/busy/status pins:
//! 1. **Access:** A read or write enable sampled high at an edge starts one access and raises busy.
//! 2. **Latency:** Busy stays high for a per-terminal number of cycles, then data and status update.
//! 3. **Faults:** Terminals can be made to report a status code or to stay busy forever.
//! 4. **Latch:** A read started while the write-mode latch is high completes with [`WEDGED_STATUS`].
//!
//! Holding `ResetN` low abandons any access in flight; register contents survive.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::bus::{BusHandle, Signal};
use crate::common::RegisterAddr;

use super::TICKS_PER_CYCLE;
use super::pins::Pins;
use super::storage::RegisterStore;

/// Busy cycles per access unless overridden per terminal.
pub const DEFAULT_LATENCY: u32 = 3;

/// Status reported by a read attempted while the write-mode latch is still held.
pub const WEDGED_STATUS: u16 = 0x0BAD;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Access {
    Read,
    Write(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    access: Access,
    addr: RegisterAddr,
    remaining: u32,
    stuck: bool,
    wedged: bool,
}

/// Register device with busy/status handshaking.
#[derive(Debug)]
pub struct RegisterBank {
    pins: Pins,
    store: RegisterStore,
    cycles: u64,
    ticks_per_cycle: u64,
    latency: HashMap<u16, u32>,
    stuck_busy: HashSet<u16>,
    status_faults: HashMap<u16, u16>,
    pending: Option<Pending>,
    accesses: u64,
}

impl RegisterBank {
    /// Creates an idle device with empty registers.
    pub fn new() -> Self {
        Self {
            pins: Pins::new(),
            store: RegisterStore::new(),
            cycles: 0,
            ticks_per_cycle: TICKS_PER_CYCLE,
            latency: HashMap::new(),
            stuck_busy: HashSet::new(),
            status_faults: HashMap::new(),
            pending: None,
            accesses: 0,
        }
    }

    /// Sets the busy latency of every access to `terminal`.
    pub fn set_latency(&mut self, terminal: u16, cycles: u32) {
        let _ = self.latency.insert(terminal, cycles.max(1));
    }

    /// Makes every access to `terminal` stay busy forever.
    pub fn stick_busy(&mut self, terminal: u16) {
        let _ = self.stuck_busy.insert(terminal);
    }

    /// Makes every access to `terminal` complete with status `code`.
    pub fn fail_terminal(&mut self, terminal: u16, code: u16) {
        let _ = self.status_faults.insert(terminal, code);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&mut self) {
        self.stuck_busy.clear();
        self.status_faults.clear();
    }

    /// Returns the register contents.
    pub const fn store(&self) -> &RegisterStore {
        &self.store
    }

    /// Returns the register contents mutably, for preloading.
    pub const fn store_mut(&mut self) -> &mut RegisterStore {
        &mut self.store
    }

    /// Returns the number of host signal writes so far.
    pub const fn signal_writes(&self) -> u64 {
        self.pins.host_writes()
    }

    /// Returns the number of register accesses started so far.
    pub const fn accesses(&self) -> u64 {
        self.accesses
    }

    /// Returns the elapsed clock cycles.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    fn reset(&mut self) {
        self.pending = None;
        self.pins.drive(Signal::Busy, 0);
        self.pins.drive(Signal::Status, 0);
        self.pins.drive(Signal::DataOut, 0);
    }

    fn start(&mut self, access: Access) {
        let addr = RegisterAddr::new(
            self.pins.get(Signal::TerminalAddr) as u16,
            self.pins.get(Signal::RegAddr),
        );
        let wedged = access == Access::Read && self.pins.is_high(Signal::WriteMode);
        self.pending = Some(Pending {
            access,
            addr,
            remaining: self
                .latency
                .get(&addr.terminal)
                .copied()
                .unwrap_or(DEFAULT_LATENCY),
            stuck: self.stuck_busy.contains(&addr.terminal),
            wedged,
        });
        self.accesses += 1;
        trace!(%addr, ?access, wedged, "access start");
        self.pins.drive(Signal::Busy, 1);
        self.pins.drive(Signal::Status, 0);
    }

    fn complete(&mut self, pending: Pending) {
        let status = if pending.wedged {
            WEDGED_STATUS
        } else {
            self.status_faults
                .get(&pending.addr.terminal)
                .copied()
                .unwrap_or(0)
        };

        match pending.access {
            Access::Read => {
                let value = if pending.wedged {
                    0
                } else {
                    self.store.read(pending.addr)
                };
                self.pins.drive(Signal::DataOut, value);
            }
            Access::Write(value) => {
                if status == 0 {
                    self.store.write(pending.addr, value);
                }
            }
        }

        trace!(addr = %pending.addr, status, "access complete");
        self.pins.drive(Signal::Busy, 0);
        self.pins.drive(Signal::Status, u32::from(status));
    }

    fn clock(&mut self) {
        self.cycles += 1;

        if !self.pins.is_high(Signal::ResetN) {
            self.reset();
            return;
        }

        match self.pending {
            Some(mut pending) => {
                if !pending.stuck {
                    pending.remaining -= 1;
                }
                if pending.remaining == 0 {
                    self.pending = None;
                    self.complete(pending);
                } else {
                    self.pending = Some(pending);
                }
            }
            None => {
                if self.pins.is_high(Signal::ReadEnable) {
                    self.start(Access::Read);
                } else if self.pins.is_high(Signal::WriteEnable) {
                    self.start(Access::Write(self.pins.get(Signal::DataIn)));
                }
            }
        }
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl BusHandle for RegisterBank {
    fn read(&self, signal: Signal) -> u32 {
        self.pins.get(signal)
    }

    fn write(&mut self, signal: Signal, value: u32) {
        self.pins.host_write(signal, value);
    }

    fn advance(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    fn now(&self) -> u64 {
        self.cycles * self.ticks_per_cycle
    }
}
