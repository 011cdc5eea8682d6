//! Codec Tests
//!
//! Tests for command and status frame encoding/decoding.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use rackwire::protocol::{
    CommandFrame, FieldLayout, Operation,
    encode_command, decode_command,
    encode_status, decode_status, decode_status_at, decode_words,
    read_command, write_command, write_status,
    COMMAND_FRAME_LEN, STATUS_FRAME_LEN,
};
use rackwire::RackError;

fn stow() -> Arc<FieldLayout> {
    Arc::new(FieldLayout::stow())
}

fn wms() -> Arc<FieldLayout> {
    Arc::new(FieldLayout::wms())
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_status_request() {
    assert_eq!(&encode_command(0, 2)[..], &[0x00, 0x00, 0x02, 0x00]);
    assert_eq!(&CommandFrame::status_request().to_bytes()[..], &[0x00, 0x00, 0x02, 0x00]);
}

#[test]
fn test_encode_open_aisle_bounds() {
    let first = CommandFrame::open_aisle(1).unwrap();
    assert_eq!(&first.to_bytes()[..], &[0x01, 0x00, 0x01, 0x00]);

    let last = CommandFrame::open_aisle(19).unwrap();
    assert_eq!(&last.to_bytes()[..], &[0x13, 0x00, 0x01, 0x00]);
}

#[test]
fn test_open_aisle_rejects_out_of_range() {
    for aisle in [0u16, 20, 255, u16::MAX] {
        match CommandFrame::open_aisle(aisle) {
            Err(RackError::InvalidArgument(_)) => {}
            other => panic!("aisle {}: expected InvalidArgument, got {:?}", aisle, other),
        }
    }
}

#[test]
fn test_encode_is_little_endian() {
    assert_eq!(&encode_command(0x1234, 0xABCD)[..], &[0x34, 0x12, 0xCD, 0xAB]);
    assert_eq!(encode_command(0, 0).len(), COMMAND_FRAME_LEN);
}

#[test]
fn test_encode_decode_command_preserves_params() {
    let samples = [(0u16, 2u16), (7, 1), (0xFFFF, 0), (0x0100, 0x00FF), (u16::MAX, u16::MAX)];
    for (p1, p2) in samples {
        let decoded = decode_command(&encode_command(p1, p2)).unwrap();
        assert_eq!((decoded.param1(), decoded.param2()), (p1, p2));
    }
}

#[test]
fn test_decode_command_wrong_length() {
    for len in [0usize, 3, 5] {
        let bytes = vec![0u8; len];
        match decode_command(&bytes) {
            Err(RackError::MalformedFrame { len: got, expected }) => {
                assert_eq!(got, len);
                assert_eq!(expected, COMMAND_FRAME_LEN);
            }
            other => panic!("Expected MalformedFrame, got {:?}", other),
        }
    }
}

#[test]
fn test_command_operation_classification() {
    assert_eq!(CommandFrame::status_request().operation(), Operation::RequestStatus);
    assert_eq!(CommandFrame::new(12, 1).operation(), Operation::OpenAisle(12));
    assert_eq!(
        CommandFrame::new(20, 1).operation(),
        Operation::Unknown { param1: 20, param2: 1 }
    );
    assert_eq!(
        CommandFrame::new(3, 2).operation(),
        Operation::Unknown { param1: 3, param2: 2 }
    );
}

// =============================================================================
// Status Decoding Tests
// =============================================================================

#[test]
fn test_decode_all_zero_frame() {
    let status = decode_status(&[0u8; STATUS_FRAME_LEN], &stow()).unwrap();

    assert_eq!(status.words(), &[0u16; 10]);
    assert_eq!(status.can_open(), Some(false));
    assert_eq!(status.ready_to_operate(), Some(false));
    assert_eq!(status.manual_mode(), Some(false));
    assert_eq!(status.power_on(), Some(false));
    assert_eq!(status.automatic_mode(), Some(false));
    assert_eq!(status.night_mode(), Some(false));
    assert_eq!(status.moving(), Some(false));
    assert_eq!(status.lighting_on(), Some(false));
    assert_eq!(status.mobile_quantity(), Some(0));
    assert_eq!(status.position_1_raw(), Some(0));
}

#[test]
fn test_decode_wrong_lengths() {
    for len in [0usize, 1, 19, 21, 1000] {
        let bytes = vec![0u8; len];
        match decode_status(&bytes, &stow()) {
            Err(RackError::MalformedFrame { len: got, expected }) => {
                assert_eq!(got, len);
                assert_eq!(expected, STATUS_FRAME_LEN);
            }
            other => panic!("len {}: expected MalformedFrame, got {:?}", len, other),
        }
    }
}

#[test]
fn test_decode_word_offsets() {
    let bytes: [u8; 20] = [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00,
    ];
    let status = decode_status(&bytes, &stow()).unwrap();

    assert_eq!(status.words(), &[1, 0, 0, 1, 0, 0, 0, 0, 5, 0]);
    assert_eq!(status.word(0), Some(1));
    assert_eq!(status.word(3), Some(1));
    assert_eq!(status.word(8), Some(5));
    assert_eq!(status.word(10), None);

    // stow: word 0 can_open, word 3 power_on, word 8 mobile_quantity
    assert_eq!(status.can_open(), Some(true));
    assert_eq!(status.power_on(), Some(true));
    assert_eq!(status.mobile_quantity(), Some(5));
    assert_eq!(status.ready_to_operate(), Some(false));
    assert_eq!(status.manual_mode(), Some(false));
    assert_eq!(status.position_1_raw(), Some(0));
}

#[test]
fn test_decode_high_byte_is_most_significant() {
    let mut bytes = [0u8; 20];
    bytes[16] = 0x34;
    bytes[17] = 0x12;
    let words = decode_words(&bytes).unwrap();
    assert_eq!(words[8], 0x1234);
}

#[test]
fn test_flag_requires_exactly_one() {
    let mut words = [0u16; 10];
    words[0] = 2;
    words[3] = 0x0100;
    let status = decode_status(&encode_status(&words), &stow()).unwrap();

    assert_eq!(status.can_open(), Some(false));
    assert_eq!(status.power_on(), Some(false));
}

#[test]
fn test_decode_does_not_mutate_input() {
    let bytes: Vec<u8> = (0u8..20).collect();
    let copy = bytes.clone();
    let _ = decode_status(&bytes, &stow()).unwrap();
    assert_eq!(bytes, copy);
}

#[test]
fn test_decode_real_controller_response() {
    let bytes = [0, 0, 2, 5, 2, 2, 0, 0, 223, 27, 0, 0, 0, 0, 0, 0, 0, 14, 0, 0];
    let words = decode_words(&bytes).unwrap();
    assert_eq!(words, [0, 1282, 514, 0, 7135, 0, 0, 0, 3584, 0]);
}

#[test]
fn test_wms_layout_scales_positions() {
    let words = [1, 1, 1, 0, 0, 6, 1250, 305, 1, 0];
    let status = decode_status(&encode_status(&words), &wms()).unwrap();

    assert_eq!(status.can_open(), Some(true));
    assert_eq!(status.power_on(), Some(true));
    assert_eq!(status.automatic_mode(), Some(true));
    assert_eq!(status.manual_mode(), Some(false));
    assert_eq!(status.night_mode(), Some(false));
    assert_eq!(status.mobile_quantity(), Some(6));
    assert_eq!(status.position_1_raw(), Some(1250));
    assert_eq!(status.position_1(), Some(12.5));
    assert_eq!(status.position_2(), Some(3.05));
    assert_eq!(status.lighting_on(), Some(true));
    assert_eq!(status.ready_to_operate(), None);
}

#[test]
fn test_unmapped_fields_are_none() {
    let status = decode_status(&[0u8; 20], &stow()).unwrap();
    assert_eq!(status.position_2_raw(), None);
    assert_eq!(status.position_2(), None);
}

#[test]
fn test_decode_at_uses_given_timestamp() {
    let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
    let status = decode_status_at(&[0u8; 20], &stow(), at).unwrap();

    assert_eq!(status.captured_at(), at);
    assert_eq!(status.snapshot().captured_at_ms, 1_700_000_000_123);
}

#[test]
fn test_status_hex_and_bytes() {
    let mut words = [0u16; 10];
    words[0] = 1;
    words[9] = 0xBEEF;
    let status = decode_status(&encode_status(&words), &stow()).unwrap();

    assert_eq!(status.as_bytes().len(), STATUS_FRAME_LEN);
    assert_eq!(
        status.to_hex(),
        "01 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 EF BE"
    );
}

#[test]
fn test_display_lists_mapped_fields() {
    let mut words = [0u16; 10];
    words[3] = 1;
    words[8] = 4;
    let status = decode_status(&encode_status(&words), &stow()).unwrap();
    let rendered = status.to_string();

    assert!(rendered.starts_with("can_open: no"));
    assert!(rendered.contains("power_on: yes"));
    assert!(rendered.contains("mobile_quantity: 4"));
    assert!(!rendered.contains("position_2"));
}

#[test]
fn test_snapshot_serializes_to_json() {
    let status = decode_status(&[0u8; 20], &wms()).unwrap();
    let json = serde_json::to_value(status.snapshot()).unwrap();

    assert_eq!(json["layout"], "wms");
    assert_eq!(json["power_on"], false);
    assert_eq!(json["position_1"], 0.0);
    assert!(json["ready_to_operate"].is_null());
    assert_eq!(json["words"].as_array().unwrap().len(), 10);
}

// =============================================================================
// Stream-based I/O Tests
// =============================================================================

#[test]
fn test_write_read_command_stream() {
    let mut buffer = Vec::new();
    write_command(&mut buffer, &CommandFrame::open_aisle(7).unwrap()).unwrap();
    write_command(&mut buffer, &CommandFrame::status_request()).unwrap();
    assert_eq!(buffer, vec![7, 0, 1, 0, 0, 0, 2, 0]);

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_command(&mut cursor).unwrap().operation(), Operation::OpenAisle(7));
    assert_eq!(read_command(&mut cursor).unwrap().operation(), Operation::RequestStatus);

    match read_command(&mut cursor) {
        Err(RackError::Connection { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof)
        }
        other => panic!("Expected Connection error at EOF, got {:?}", other),
    }
}

#[test]
fn test_write_status_stream() {
    let words = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
    let mut buffer = Vec::new();
    write_status(&mut buffer, &words).unwrap();

    assert_eq!(buffer.len(), STATUS_FRAME_LEN);
    assert_eq!(decode_words(&buffer).unwrap(), words);
}
