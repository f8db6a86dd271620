//! # Direct-Register Transport Tests
//!
//! Enable pulses, busy polling, status checks, and write-mode latch handling.

use pretty_assertions::assert_eq;
use simlink_core::UsbCommError;
use simlink_core::bus::{BusHandle, Signal};
use simlink_core::common::{RegisterAddr, WaitTarget};
use simlink_core::config::RegisterTiming;
use simlink_core::devices::{RegisterBank, TICKS_PER_CYCLE};
use simlink_core::protocol::codec::{Checksum, CommandHeader, Opcode};
use simlink_core::protocol::timeout::Deadline;
use simlink_core::transport::{RegisterTransport, TransportKind, WordTransport};

use crate::common::mocks::bus::silent_bus;

const TERM: u16 = 2;
const REG: u32 = 0x20;

fn transport() -> RegisterTransport {
    RegisterTransport::new(RegisterTiming::default())
}

fn header(opcode: Opcode, words: u32) -> CommandHeader {
    CommandHeader::new(opcode, TERM, REG, words * 4)
}

#[test]
fn kind() {
    assert_eq!(transport().kind(), TransportKind::Register);
}

#[test]
fn read_walks_registers() {
    let mut bank = RegisterBank::new();
    bank.store_mut()
        .load(RegisterAddr::new(TERM, REG), &[0x11, 0x22, 0x33]);
    let mut t = transport();
    let mut out = [0u32; 3];

    t.begin(&mut bank, &header(Opcode::Read, 3), Deadline::NEVER)
        .unwrap();
    t.read_window(&mut bank, &mut out, Deadline::NEVER).unwrap();
    t.finish(&mut bank, Checksum::of(&out), Deadline::NEVER)
        .unwrap();

    assert_eq!(out, [0x11, 0x22, 0x33]);
    assert_eq!(t.cursor(), RegisterAddr::new(TERM, REG + 3));
    assert_eq!(bank.read(Signal::RegAddr), REG + 3);
    assert_eq!(bank.read(Signal::TerminalAddr), u32::from(TERM));
    assert_eq!(bank.accesses(), 3);
    assert!(!t.is_latched());
}

#[test]
fn slow_device_is_polled_until_idle() {
    let mut bank = RegisterBank::new();
    bank.set_latency(TERM, 40);
    bank.store_mut().write(RegisterAddr::new(TERM, REG), 0xbeef);
    let mut t = transport();
    let mut out = [0u32; 1];

    t.begin(&mut bank, &header(Opcode::Read, 1), Deadline::NEVER)
        .unwrap();
    t.read_window(&mut bank, &mut out, Deadline::NEVER).unwrap();

    assert_eq!(out, [0xbeef]);
    assert!(bank.cycles() > 40);
    assert!(!bank.is_high(Signal::Busy));
}

#[test]
fn write_holds_latch_until_finish() {
    let mut bank = RegisterBank::new();
    let mut t = transport();

    t.begin(&mut bank, &header(Opcode::Write, 2), Deadline::NEVER)
        .unwrap();
    assert!(t.is_latched());
    assert!(bank.is_high(Signal::WriteMode));

    t.write_window(&mut bank, &[5, 6], Deadline::NEVER).unwrap();
    assert!(bank.is_high(Signal::WriteMode));

    t.finish(&mut bank, Checksum::new(), Deadline::NEVER)
        .unwrap();
    assert!(!bank.is_high(Signal::WriteMode));
    assert!(!t.is_latched());
    assert_eq!(bank.store().dump(RegisterAddr::new(TERM, REG), 2), vec![5, 6]);
}

#[test]
fn read_status_keeps_sampled_word() {
    let mut bank = RegisterBank::new();
    bank.store_mut().write(RegisterAddr::new(TERM, REG), 0x77);
    bank.fail_terminal(TERM, 0x21);
    let mut t = transport();
    let mut out = [0u32; 2];

    t.begin(&mut bank, &header(Opcode::Read, 2), Deadline::NEVER)
        .unwrap();
    let err = t
        .read_window(&mut bank, &mut out, Deadline::NEVER)
        .unwrap_err();

    assert_eq!(err, UsbCommError::DeviceStatusError { code: 0x21 });
    assert_eq!(out, [0x77, 0]);
}

#[test]
fn write_status_releases_latch() {
    let mut bank = RegisterBank::new();
    bank.fail_terminal(TERM, 4);
    let mut t = transport();

    t.begin(&mut bank, &header(Opcode::Write, 1), Deadline::NEVER)
        .unwrap();
    let err = t
        .write_window(&mut bank, &[9], Deadline::NEVER)
        .unwrap_err();

    assert_eq!(err, UsbCommError::DeviceStatusError { code: 4 });
    assert!(!t.is_latched());
    assert!(!bank.is_high(Signal::WriteMode));
    assert!(bank.store().is_empty());
}

#[test]
fn stuck_busy_read_times_out_at_deadline() {
    let mut bank = RegisterBank::new();
    bank.stick_busy(TERM);
    let mut t = transport();
    let deadline = Deadline(bank.now() + 5_000);
    let mut out = [0u32; 1];

    t.begin(&mut bank, &header(Opcode::Read, 1), deadline).unwrap();
    let err = t.read_window(&mut bank, &mut out, deadline).unwrap_err();

    assert_eq!(
        err,
        UsbCommError::Timeout {
            waiting_for: WaitTarget::Busy,
            deadline: 5_000
        }
    );
    assert!(bank.now() >= 5_000);
    assert!(bank.now() < 5_000 + TICKS_PER_CYCLE);
}

#[test]
fn write_timeout_releases_latch() {
    let mut bank = RegisterBank::new();
    bank.stick_busy(TERM);
    let mut t = transport();
    let deadline = Deadline(2_000);

    t.begin(&mut bank, &header(Opcode::Write, 1), deadline).unwrap();
    let err = t.write_window(&mut bank, &[1], deadline).unwrap_err();

    assert!(err.is_timeout());
    assert!(!t.is_latched());
    assert!(!bank.is_high(Signal::WriteMode));
    assert!(bank.now() >= 2_000);
    assert!(bank.now() < 2_000 + TICKS_PER_CYCLE);
    assert_eq!(t.owed_cycles(), RegisterTiming::default().timeout_release_cycles);
}

#[test]
fn owed_release_is_idled_by_next_begin() {
    let mut bank = RegisterBank::new();
    bank.stick_busy(TERM);
    let mut t = transport();
    let deadline = Deadline(2_000);
    t.begin(&mut bank, &header(Opcode::Write, 1), deadline).unwrap();
    assert!(t.write_window(&mut bank, &[1], deadline).is_err());
    let cycles = bank.cycles();

    t.begin(&mut bank, &header(Opcode::Read, 1), Deadline::NEVER)
        .unwrap();

    let owed = u64::from(RegisterTiming::default().timeout_release_cycles);
    assert_eq!(bank.cycles(), cycles + owed + 1);
    assert_eq!(t.owed_cycles(), 0);
}

#[test]
fn abort_drops_latch() {
    let mut bank = RegisterBank::new();
    let mut t = transport();
    t.begin(&mut bank, &header(Opcode::Write, 4), Deadline::NEVER)
        .unwrap();

    let cycles = bank.cycles();

    t.abort(&mut bank);

    assert_eq!(bank.cycles(), cycles);
    assert_eq!(t.owed_cycles(), RegisterTiming::default().timeout_release_cycles);
    assert!(!t.is_latched());
    assert!(!bank.is_high(Signal::WriteMode));
    assert!(!bank.is_high(Signal::WriteEnable));
}

#[test]
fn set_window_does_not_touch_bus() {
    let mut bus = silent_bus();
    transport()
        .set_window(&mut bus, 256, Deadline::NEVER)
        .unwrap();
}
