//! Bus transaction protocol engine for clock-stepped hardware models.
//!
//! This crate drives register gets/sets and bulk block transfers against a simulated
//! device through a handful of named signal lines, the way a real device link would:
//! 1. **Bus:** The `BusHandle` trait (signal peek/poke, clock advance, time source) and a logging decorator.
//! 2. **Protocol:** Timeout clock, packet codec, handshake state machine, and chunked transfer engine.
//! 3. **Transports:** Direct-register and burst-FIFO word transports behind one trait.
//! 4. **Link:** The transaction API (`get`, `set`, `block_read`, `block_write`).
//! 5. **Devices:** Software reference models of both device variants for tests and the CLI.

/// Bus handle trait, signal names, and bus logging.
pub mod bus;
/// Common types and constants (addresses, wire constants, errors).
pub mod common;
/// Link configuration (defaults, transport routing, timing).
pub mod config;
/// Reference device models implementing `BusHandle`.
pub mod devices;
/// Transaction API over a bus handle.
pub mod link;
/// Protocol engine (timeouts, codec, handshake, chunked transfers).
pub mod protocol;
/// Word transports (direct register and burst FIFO).
pub mod transport;

/// Root configuration type; use `LinkConfig::default()` or deserialize from JSON.
pub use crate::config::LinkConfig;
/// Error type returned by every transaction.
pub use crate::common::UsbCommError;
/// Signal-level interface to the hardware model.
pub use crate::bus::{BusHandle, Signal};
/// Transaction API; construct with `Link::new`.
pub use crate::link::Link;
