//! # Packet Codec Tests
//!
//! Header layout and decoding errors, ack validation order, and checksum properties.

use proptest::prelude::*;
use simlink_core::common::ACK_ID;
use simlink_core::protocol::codec::*;

#[test]
fn decode_rejects_bad_prefix() {
    let mut bytes = encode_command(Opcode::Read, 1, 2, 4);
    bytes[1] = 0xC4;
    assert_eq!(
        CommandHeader::decode(&bytes),
        Err(CodecError::BadPrefix(0xC401))
    );
}

#[test]
fn decode_rejects_unknown_opcode() {
    let mut bytes = encode_command(Opcode::Read, 1, 2, 4);
    bytes[0] = 0x03;
    assert_eq!(
        CommandHeader::decode(&bytes),
        Err(CodecError::UnknownOpcode(3))
    );
}

#[test]
fn decode_rejects_unaligned_length() {
    let bytes = encode_command(Opcode::Write, 1, 2, 6);
    assert_eq!(
        CommandHeader::decode(&bytes),
        Err(CodecError::UnalignedLength(6))
    );
}

#[test]
fn transfer_words() {
    assert_eq!(CommandHeader::new(Opcode::Read, 0, 0, 2400).transfer_words(), 600);
}

#[test]
fn ack_checks_id_first() {
    let raw = [0x1234 | (0x0001 << 16), 0x0005];
    assert_eq!(
        decode_and_validate_ack(&raw, 0x0002),
        Err(AckFailure::BadAckId { id: 0x1234 })
    );
}

#[test]
fn ack_checks_checksum_before_status() {
    let raw = AckPacket::new(0x0010, 3).to_words();
    assert_eq!(
        decode_and_validate_ack(&raw, 0x0011),
        Err(AckFailure::ChecksumMismatch {
            expected: 0x0011,
            actual: 0x0010
        })
    );
}

#[test]
fn ack_reports_status() {
    let raw = AckPacket::new(0x0010, 3).to_words();
    assert_eq!(
        decode_and_validate_ack(&raw, 0x0010),
        Err(AckFailure::DeviceStatusError { code: 3 })
    );
}

#[test]
fn ack_uses_last_two_words() {
    let mut raw = vec![0xffff_ffff, 0x1234_5678];
    raw.extend(AckPacket::new(0x00aa, 0).to_words());
    let ack = decode_and_validate_ack(&raw, 0x00aa).unwrap();
    assert_eq!(ack.id, ACK_ID);
    assert_eq!(ack.checksum, 0x00aa);
}

#[test]
fn checksum_of_empty_is_zero() {
    assert_eq!(Checksum::of(&[]).value(), 0);
    assert_eq!(Checksum::default(), Checksum::new());
}

fn opcode() -> impl Strategy<Value = Opcode> {
    prop_oneof![Just(Opcode::Read), Just(Opcode::Write)]
}

proptest! {
    #[test]
    fn prop_header_round_trips(
        op in opcode(),
        terminal in any::<u16>(),
        reg in any::<u32>(),
        words in 0u32..(u32::MAX / 4),
    ) {
        let header = CommandHeader::new(op, terminal, reg, words * 4);
        prop_assert_eq!(CommandHeader::decode(&header.encode()), Ok(header));
        prop_assert_eq!(CommandHeader::from_words(&header.to_words()), Ok(header));
        prop_assert_eq!(header.buffer_length, 1024);
    }

    #[test]
    fn prop_checksum_is_truncated_sum(words in proptest::collection::vec(any::<u32>(), 0..600)) {
        let expected = words.iter().fold(0u64, |acc, &w| acc + u64::from(w)) as u16;
        prop_assert_eq!(Checksum::of(&words).value(), expected);
    }

    #[test]
    fn prop_ack_validates_iff_checksum_matches(
        words in proptest::collection::vec(any::<u32>(), 0..64),
        carried in any::<u16>(),
    ) {
        let local = Checksum::of(&words).value();
        let raw = AckPacket::new(carried, 0).to_words();
        let result = decode_and_validate_ack(&raw, local);
        if carried == local {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(
                result,
                Err(AckFailure::ChecksumMismatch { expected: local, actual: carried })
            );
        }
    }
}
