//! # Handshake State Machine Tests
//!
//! Runs the burst handshake against a scripted producer and checks that every word is
//! stored exactly once, in order, whatever the ready pattern.

use pretty_assertions::assert_eq;
use rstest::rstest;
use simlink_core::UsbCommError;
use simlink_core::bus::{BusHandle, Control, Signal};
use simlink_core::common::WaitTarget;
use simlink_core::protocol::handshake::Handshake;
use simlink_core::protocol::timeout::Deadline;

use crate::common::harness::ramp;
use crate::common::mocks::stream::{StreamBus, TICKS};

fn handshake() -> Handshake {
    Handshake::new(1000, 4)
}

#[test]
fn empty_request_touches_nothing() {
    let mut bus = StreamBus::always([1, 2, 3]);
    let mut out = [];
    handshake()
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap();
    assert_eq!(bus.now(), 0);
    assert!(bus.controls.is_empty());
}

#[test]
fn fast_producer_delivers_in_order() {
    let words = ramp(0x100, 16);
    let mut bus = StreamBus::always(words.clone());
    let mut out = vec![0; 16];
    handshake()
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap();
    assert_eq!(out, words);
    assert_eq!(bus.popped, words);
}

#[test]
fn does_not_consume_past_request() {
    let words = ramp(1, 10);
    let mut bus = StreamBus::always(words.clone());
    let mut out = vec![0; 3];
    handshake()
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap();
    assert_eq!(out, &words[..3]);
    assert_eq!(bus.remaining(), 7);
}

#[rstest]
#[case::every_other_cycle(2)]
#[case::within_drain(4)]
#[case::past_drain(7)]
#[case::long_stall(40)]
fn gapped_producer_loses_nothing(#[case] period: u64) {
    let words = ramp(0xabc0, 25);
    let mut bus = StreamBus::new(words.clone(), move |cycle| cycle % period == 0);
    let mut out = vec![0; 25];
    handshake()
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap();
    assert_eq!(out, words);
    assert_eq!(bus.popped, words);
}

#[test]
fn word_held_while_ready_low_is_not_duplicated() {
    // DataOut keeps showing the unpopped word 11 through the stall
    let mut bus = StreamBus::new([10, 11, 12], |cycle| !(2..6).contains(&cycle));
    let mut out = [0; 3];
    handshake()
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap();
    assert_eq!(out, [10, 11, 12]);
    assert_eq!(bus.popped, [10, 11, 12]);
    assert_eq!(bus.remaining(), 0);
}

#[test]
fn control_patterns_follow_states() {
    let mut bus = StreamBus::always([7, 8]);
    let mut out = [0; 2];
    handshake()
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap();
    // one wait edge, two active, four drain, one done
    assert_eq!(
        bus.controls,
        [
            Control::REQUEST,
            Control::ACTIVE,
            Control::ACTIVE,
            Control::DRAIN,
            Control::DRAIN,
            Control::DRAIN,
            Control::DRAIN,
            Control::IDLE,
        ]
    );
    assert_eq!(bus.read(Signal::Control), Control::IDLE);
}

#[test]
fn never_ready_exhausts_cycle_budget() {
    let mut bus = StreamBus::new([1], |_| false);
    let mut out = [0; 1];
    let err = Handshake::new(50, 4)
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap_err();
    assert_eq!(err, UsbCommError::HandshakeTimeout { cycles: 51 });
    assert_eq!(bus.now(), 51 * TICKS);
    assert_eq!(bus.read(Signal::Control), Control::IDLE);
}

#[test]
fn deadline_fires_within_one_cycle() {
    let mut bus = StreamBus::new([1], |_| false);
    let mut out = [0; 1];
    let deadline = Deadline(1000);
    let err = Handshake::new(u32::MAX, 4)
        .run(&mut bus, &mut out, deadline, WaitTarget::Drain)
        .unwrap_err();
    assert_eq!(
        err,
        UsbCommError::Timeout {
            waiting_for: WaitTarget::Drain,
            deadline: 1000
        }
    );
    assert!(bus.now() >= 1000);
    assert!(bus.now() < 1000 + TICKS);
}

#[test]
fn partial_prefix_kept_on_stall() {
    let mut bus = StreamBus::new([10, 11, 12], |cycle| cycle < 3);
    let mut out = [0; 3];
    let err = Handshake::new(20, 4)
        .run(&mut bus, &mut out, Deadline::NEVER, WaitTarget::Drain)
        .unwrap_err();
    assert!(matches!(err, UsbCommError::HandshakeTimeout { .. }));
    assert_eq!(bus.popped, [10, 11]);
    assert_eq!(out, [10, 11, 0]);
}
