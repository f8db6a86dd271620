//! Configuration for the transaction link.
//!
//! This module defines the structures used to parameterize the protocol engine. It provides:
//! 1. **Defaults:** Timeout scale, burst window, handshake budget, and pin timing.
//! 2. **Routing:** Which word transport serves each terminal.
//! 3. **Legacy data:** Companion-terminal bypass list and the firmware-version shim.
//!
//! Configuration is supplied as JSON (`LinkConfig::from_json` / `LinkConfig::load`) or built
//! with `LinkConfig::default()`.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::common::constants;

/// Default configuration constants for the link.
mod defaults {
    use crate::common::constants;

    /// Simulated-time ticks per timeout unit (one unit is roughly a million ticks).
    pub const TIME_SCALE: u64 = constants::TIME_SCALE;

    /// Words per burst window before the transfer count must be re-issued.
    pub const BURST_WORDS: u32 = constants::BURST_WORDS;

    /// Consecutive cycles the handshake waits for ready before giving up.
    pub const HANDSHAKE_CYCLE_BUDGET: u32 = 1000;

    /// Idle cycles after deasserting the read request before a burst is considered over.
    pub const DRAIN_CYCLES: u8 = 4;

    /// Idle cycles after an enable pulse before polling busy.
    pub const SETTLE_CYCLES: u32 = 10;

    /// Idle cycles after dropping the write-mode latch at the end of a write.
    pub const WRITE_RELEASE_CYCLES: u32 = 30;

    /// Idle cycles owed after dropping the write-mode latch on a timeout, paid by the next transaction.
    pub const TIMEOUT_RELEASE_CYCLES: u32 = 10;

    /// Idle cycles before waiting on ready for a control-word write.
    pub const SETUP_CYCLES: u32 = 4;

    /// Idle cycles after a control-word write.
    pub const HOLD_CYCLES: u32 = 5;

    /// Idle cycles between selecting a data or ack state and moving words.
    pub const LEAD_CYCLES: u32 = 5;
}

/// Word transport variant serving a terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Direct register pins: enable pulses, busy, status, write-mode latch.
    #[serde(alias = "Register")]
    Register,
    /// Burst FIFO: command header, transfer counts, ready/valid handshake, ack packet.
    #[default]
    #[serde(alias = "Fifo", alias = "FIFO")]
    Fifo,
}

/// Routes one terminal to a transport variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TerminalRoute {
    /// Terminal address.
    pub terminal: u16,
    /// Transport serving it.
    pub transport: TransportKind,
}

/// Register read that is answered with a fixed value and no bus activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FirmwareShim {
    /// Terminal address matched by the shim.
    pub terminal: u16,
    /// Register address matched by the shim.
    pub reg: u32,
    /// Value returned by `get`.
    pub value: u16,
}

impl Default for FirmwareShim {
    fn default() -> Self {
        Self {
            terminal: constants::FIRMWARE_VERSION_TERMINAL,
            reg: constants::FIRMWARE_VERSION_REG,
            value: constants::FIRMWARE_VERSION,
        }
    }
}

/// Root link configuration.
///
/// # Examples
///
/// ```
/// use simlink_core::config::{LinkConfig, TransportKind};
///
/// let json = r#"{
///     "time_scale": 1000,
///     "default_transport": "register",
///     "routes": [ { "terminal": 2, "transport": "fifo" } ],
///     "firmware_shim": null
/// }"#;
///
/// let config = LinkConfig::from_json(json).unwrap();
/// assert_eq!(config.time_scale, 1000);
/// assert_eq!(config.transport_for(2), TransportKind::Fifo);
/// assert_eq!(config.transport_for(7), TransportKind::Register);
/// assert!(config.firmware_shim.is_none());
/// assert_eq!(config.burst_words, 256);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Simulated-time ticks per timeout unit
    #[serde(default = "LinkConfig::default_time_scale")]
    pub time_scale: u64,

    /// Words per burst window
    #[serde(default = "LinkConfig::default_burst_words")]
    pub burst_words: u32,

    /// Handshake cycle budget waiting for ready (FIFO transport)
    #[serde(default = "LinkConfig::default_handshake_cycle_budget")]
    pub handshake_cycle_budget: u32,

    /// Drain cycles after a burst stops (FIFO transport)
    #[serde(default = "LinkConfig::default_drain_cycles")]
    pub drain_cycles: u8,

    /// Transport used by terminals without an explicit route
    #[serde(default)]
    pub default_transport: TransportKind,

    /// Per-terminal transport overrides
    #[serde(default)]
    pub routes: Vec<TerminalRoute>,

    /// Terminals answered without bus traffic on the direct-register transport
    #[serde(default = "LinkConfig::default_bypass_terminals")]
    pub bypass_terminals: Vec<u16>,

    /// Firmware-version shim; `null` disables it
    #[serde(default = "LinkConfig::default_firmware_shim")]
    pub firmware_shim: Option<FirmwareShim>,

    /// Direct-register pin timing
    #[serde(default)]
    pub register: RegisterTiming,

    /// Burst-FIFO pin timing
    #[serde(default)]
    pub fifo: FifoTiming,
}

impl LinkConfig {
    fn default_time_scale() -> u64 {
        defaults::TIME_SCALE
    }

    fn default_burst_words() -> u32 {
        defaults::BURST_WORDS
    }

    fn default_handshake_cycle_budget() -> u32 {
        defaults::HANDSHAKE_CYCLE_BUDGET
    }

    fn default_drain_cycles() -> u8 {
        defaults::DRAIN_CYCLES
    }

    fn default_bypass_terminals() -> Vec<u16> {
        constants::COMPANION_TERMINALS.to_vec()
    }

    #[allow(clippy::unnecessary_wraps)]
    fn default_firmware_shim() -> Option<FirmwareShim> {
        Some(FirmwareShim::default())
    }

    /// Parses and validates a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and `ConfigError::Invalid` when a
    /// value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as [`Self::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks that every tunable is in range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_scale == 0 {
            return Err(ConfigError::Invalid("time_scale must be at least 1"));
        }
        if self.burst_words == 0 {
            return Err(ConfigError::Invalid("burst_words must be at least 1"));
        }
        if self.handshake_cycle_budget == 0 {
            return Err(ConfigError::Invalid(
                "handshake_cycle_budget must be at least 1",
            ));
        }
        if self.drain_cycles == 0 {
            return Err(ConfigError::Invalid("drain_cycles must be at least 1"));
        }
        Ok(())
    }

    /// Returns the transport serving `terminal`; the last matching route wins.
    pub fn transport_for(&self, terminal: u16) -> TransportKind {
        self.routes
            .iter()
            .rev()
            .find(|route| route.terminal == terminal)
            .map_or(self.default_transport, |route| route.transport)
    }

    /// Returns `true` if `terminal` is answered without bus traffic on the register transport.
    pub fn is_bypassed(&self, terminal: u16) -> bool {
        self.bypass_terminals.contains(&terminal)
    }

    /// Returns the shimmed value for `(terminal, reg)`, if the shim is enabled and matches.
    pub fn shimmed_value(&self, terminal: u16, reg: u32) -> Option<u16> {
        self.firmware_shim
            .filter(|shim| shim.terminal == terminal && shim.reg == reg)
            .map(|shim| shim.value)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            time_scale: defaults::TIME_SCALE,
            burst_words: defaults::BURST_WORDS,
            handshake_cycle_budget: defaults::HANDSHAKE_CYCLE_BUDGET,
            drain_cycles: defaults::DRAIN_CYCLES,
            default_transport: TransportKind::default(),
            routes: Vec::new(),
            bypass_terminals: Self::default_bypass_terminals(),
            firmware_shim: Self::default_firmware_shim(),
            register: RegisterTiming::default(),
            fifo: FifoTiming::default(),
        }
    }
}

/// Pin timing for the direct-register transport, in clock cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegisterTiming {
    /// Idle cycles after an enable pulse before polling busy
    #[serde(default = "RegisterTiming::default_settle_cycles")]
    pub settle_cycles: u32,

    /// Idle cycles after dropping write mode at the end of a write or on a status error
    #[serde(default = "RegisterTiming::default_write_release_cycles")]
    pub write_release_cycles: u32,

    /// Idle cycles owed after dropping write mode on a timeout, paid at the next transaction start
    #[serde(default = "RegisterTiming::default_timeout_release_cycles")]
    pub timeout_release_cycles: u32,
}

impl RegisterTiming {
    fn default_settle_cycles() -> u32 {
        defaults::SETTLE_CYCLES
    }

    fn default_write_release_cycles() -> u32 {
        defaults::WRITE_RELEASE_CYCLES
    }

    fn default_timeout_release_cycles() -> u32 {
        defaults::TIMEOUT_RELEASE_CYCLES
    }
}

impl Default for RegisterTiming {
    fn default() -> Self {
        Self {
            settle_cycles: defaults::SETTLE_CYCLES,
            write_release_cycles: defaults::WRITE_RELEASE_CYCLES,
            timeout_release_cycles: defaults::TIMEOUT_RELEASE_CYCLES,
        }
    }
}

/// Pin timing for the burst-FIFO transport, in clock cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FifoTiming {
    /// Idle cycles before waiting on ready for a control-word write
    #[serde(default = "FifoTiming::default_setup_cycles")]
    pub setup_cycles: u32,

    /// Idle cycles after a control-word write
    #[serde(default = "FifoTiming::default_hold_cycles")]
    pub hold_cycles: u32,

    /// Idle cycles between selecting a data or ack state and moving words
    #[serde(default = "FifoTiming::default_lead_cycles", alias = "read_lead_cycles")]
    pub lead_cycles: u32,
}

impl FifoTiming {
    fn default_setup_cycles() -> u32 {
        defaults::SETUP_CYCLES
    }

    fn default_hold_cycles() -> u32 {
        defaults::HOLD_CYCLES
    }

    fn default_lead_cycles() -> u32 {
        defaults::LEAD_CYCLES
    }
}

impl Default for FifoTiming {
    fn default() -> Self {
        Self {
            setup_cycles: defaults::SETUP_CYCLES,
            hold_cycles: defaults::HOLD_CYCLES,
            lead_cycles: defaults::LEAD_CYCLES,
        }
    }
}

/// Failure to load a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid configuration JSON.
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
