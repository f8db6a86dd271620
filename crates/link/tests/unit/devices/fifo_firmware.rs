//! # FIFO Firmware Model Tests
//!
//! Host-state edges, header collection, read-data popping, ack contents, and reset.

use pretty_assertions::assert_eq;
use simlink_core::bus::{BusHandle, Control, HostState, Signal};
use simlink_core::common::RegisterAddr;
use simlink_core::common::constants::ACK_ID;
use simlink_core::devices::fifo_firmware::BAD_HEADER_STATUS;
use simlink_core::devices::{FifoDevice, FifoFault};
use simlink_core::protocol::codec::{AckPacket, CommandHeader, Opcode};

fn select(dev: &mut FifoDevice, state: HostState) {
    dev.write(Signal::HostState, state.as_u32());
}

/// One control-word strobe on the next edge.
fn strobe(dev: &mut FifoDevice, word: u32) {
    dev.write(Signal::Control, Control::WRITE);
    dev.set(Signal::WriteEnable, true);
    dev.write(Signal::DataIn, word);
    dev.advance(1);
    dev.write(Signal::Control, Control::IDLE);
    dev.set(Signal::WriteEnable, false);
}

fn enter(dev: &mut FifoDevice, state: HostState) {
    select(dev, state);
    dev.advance(1);
}

fn send_header(dev: &mut FifoDevice, header: &CommandHeader) {
    enter(dev, HostState::Command);
    for word in header.to_words() {
        strobe(dev, word);
    }
}

/// Pops the two ack words by strobing `ACK` while ready.
fn take_ack(dev: &mut FifoDevice) -> AckPacket {
    enter(dev, HostState::Ack);
    let mut words = [0u32; 2];
    for slot in &mut words {
        assert!(dev.is_high(Signal::Ready));
        *slot = dev.read(Signal::DataOut);
        dev.write(Signal::Control, Control::ACK);
        dev.advance(1);
        dev.write(Signal::Control, Control::IDLE);
    }
    AckPacket::from_words(words)
}

#[test]
fn state_change_waits_for_edge() {
    let mut dev = FifoDevice::new();
    select(&mut dev, HostState::Command);
    assert_eq!(dev.state(), HostState::Idle);
    assert!(!dev.is_high(Signal::Ready));

    dev.advance(1);
    assert_eq!(dev.state(), HostState::Command);
    assert!(dev.is_high(Signal::Ready));
}

#[test]
fn strobe_on_entry_edge_is_ignored() {
    let header = CommandHeader::new(Opcode::Read, 1, 0x40, 8);
    let words = header.to_words();
    let mut dev = FifoDevice::new();

    select(&mut dev, HostState::Command);
    strobe(&mut dev, words[0]);
    assert_eq!(dev.state(), HostState::Command);

    for word in words {
        strobe(&mut dev, word);
    }
    assert_eq!(dev.headers(), [header]);
}

#[test]
fn read_data_pops_on_ack() {
    let mut dev = FifoDevice::new();
    dev.store_mut()
        .load(RegisterAddr::new(1, 0x40), &[0xa, 0xb]);

    send_header(&mut dev, &CommandHeader::new(Opcode::Read, 1, 0x40, 8));
    enter(&mut dev, HostState::TransferCount);
    strobe(&mut dev, 2);
    assert_eq!(dev.transfer_counts(), [2]);

    enter(&mut dev, HostState::ReadData);
    assert!(dev.is_high(Signal::Ready));
    assert_eq!(dev.read(Signal::DataOut), 0xa);

    dev.advance(3);
    assert_eq!(dev.read(Signal::DataOut), 0xa);

    dev.write(Signal::Control, Control::ACTIVE);
    dev.advance(1);
    assert_eq!(dev.read(Signal::DataOut), 0xb);
    dev.advance(1);
    dev.write(Signal::Control, Control::IDLE);
    assert!(!dev.is_high(Signal::Ready));

    let ack = take_ack(&mut dev);
    assert_eq!(ack.id, ACK_ID);
    assert_eq!(ack.checksum, 0xa + 0xb);
    assert_eq!(ack.status, 0);
}

#[test]
fn gap_holds_ready_low_between_words() {
    let mut dev = FifoDevice::new();
    dev.inject(
        1,
        FifoFault {
            gap: 3,
            ..FifoFault::default()
        },
    );
    dev.store_mut().load(RegisterAddr::new(1, 0), &[1, 2]);
    send_header(&mut dev, &CommandHeader::new(Opcode::Read, 1, 0, 8));
    enter(&mut dev, HostState::TransferCount);
    strobe(&mut dev, 2);
    enter(&mut dev, HostState::ReadData);

    dev.write(Signal::Control, Control::ACTIVE);
    dev.advance(1);
    dev.write(Signal::Control, Control::IDLE);
    assert!(!dev.is_high(Signal::Ready));

    dev.advance(2);
    assert!(!dev.is_high(Signal::Ready));

    dev.advance(1);
    assert!(dev.is_high(Signal::Ready));
    assert_eq!(dev.read(Signal::DataOut), 2);
}

#[test]
fn write_data_accepts_counted_words() {
    let mut dev = FifoDevice::new();
    send_header(&mut dev, &CommandHeader::new(Opcode::Write, 2, 0x10, 8));
    enter(&mut dev, HostState::TransferCount);
    strobe(&mut dev, 2);
    enter(&mut dev, HostState::WriteData);

    for word in [0x11, 0x22, 0x33] {
        dev.write(Signal::DataIn, word);
        dev.set(Signal::WriteEnable, true);
        dev.advance(1);
        dev.set(Signal::WriteEnable, false);
    }

    assert!(!dev.is_high(Signal::Ready));
    assert_eq!(dev.store().dump(RegisterAddr::new(2, 0x10), 3), [0x11, 0x22, 0]);
    assert_eq!(take_ack(&mut dev).checksum, 0x33);
}

#[test]
fn bad_header_reports_status_in_ack() {
    let mut dev = FifoDevice::new();
    enter(&mut dev, HostState::Command);
    for _ in 0..4 {
        strobe(&mut dev, 0);
    }

    assert!(dev.headers().is_empty());
    assert_eq!(take_ack(&mut dev).status, BAD_HEADER_STATUS);
}

#[test]
fn injected_ack_faults() {
    let mut dev = FifoDevice::new();
    dev.inject(
        7,
        FifoFault {
            ack_id: Some(0x1234),
            status: 3,
            checksum_xor: 0xff,
            ..FifoFault::default()
        },
    );
    send_header(&mut dev, &CommandHeader::new(Opcode::Read, 7, 0, 0));

    let ack = take_ack(&mut dev);
    assert_eq!(ack.id, 0x1234);
    assert_eq!(ack.status, 3);
    assert_eq!(ack.checksum, 0xff);
}

#[test]
fn reset_returns_to_idle_and_keeps_registers() {
    let mut dev = FifoDevice::new();
    dev.store_mut().write(RegisterAddr::new(0, 0), 77);
    enter(&mut dev, HostState::Command);

    dev.set(Signal::ResetN, false);
    dev.advance(1);

    assert_eq!(dev.state(), HostState::Idle);
    assert!(!dev.is_high(Signal::Ready));
    assert_eq!(dev.store().read(RegisterAddr::new(0, 0)), 77);
}
