//! # Error Taxonomy Tests
//!
//! Display text, helper predicates, and conversion from ack failures.

use simlink_core::UsbCommError;
use simlink_core::common::WaitTarget;
use simlink_core::protocol::codec::AckFailure;

#[test]
fn timeout_display_names_target() {
    let err = UsbCommError::Timeout {
        waiting_for: WaitTarget::Busy,
        deadline: 44_000,
    };
    let text = err.to_string();
    assert!(text.contains("busy release"));
    assert!(text.contains("44000"));
}

#[test]
fn bad_ack_id_display_is_hex() {
    let err = UsbCommError::BadAckId { id: 0x1234 };
    assert_eq!(err.to_string(), "unexpected ack id 0x1234");
}

#[test]
fn checksum_mismatch_display() {
    let err = UsbCommError::ChecksumMismatch {
        expected: 0x00ff,
        actual: 0x0100,
    };
    assert_eq!(
        err.to_string(),
        "checksum mismatch: computed 0x00ff, ack carried 0x0100"
    );
}

#[test]
fn transfer_too_long_display() {
    let err = UsbCommError::TransferTooLong { words: 1 << 30 };
    assert_eq!(
        err.to_string(),
        "transfer of 1073741824 words exceeds the 32-bit byte length"
    );
    assert!(!err.is_timeout());
}

#[test]
fn status_code_only_for_device_status() {
    assert_eq!(UsbCommError::DeviceStatusError { code: 9 }.status_code(), Some(9));
    assert_eq!(UsbCommError::BadAckId { id: 0 }.status_code(), None);
}

#[test]
fn is_timeout_covers_both_kinds() {
    assert!(UsbCommError::HandshakeTimeout { cycles: 1001 }.is_timeout());
    assert!(
        UsbCommError::Timeout {
            waiting_for: WaitTarget::Ready,
            deadline: 0
        }
        .is_timeout()
    );
    assert!(!UsbCommError::InvalidCycleBudget.is_timeout());
    assert!(!UsbCommError::UnalignedLength { len: 3 }.is_timeout());
}

#[test]
fn ack_failures_convert() {
    assert_eq!(
        UsbCommError::from(AckFailure::BadAckId { id: 7 }),
        UsbCommError::BadAckId { id: 7 }
    );
    assert_eq!(
        UsbCommError::from(AckFailure::ChecksumMismatch {
            expected: 1,
            actual: 2
        }),
        UsbCommError::ChecksumMismatch {
            expected: 1,
            actual: 2
        }
    );
    assert_eq!(
        UsbCommError::from(AckFailure::DeviceStatusError { code: 5 }),
        UsbCommError::DeviceStatusError { code: 5 }
    );
}
