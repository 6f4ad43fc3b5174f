//! Transaction Log Record Format Tests
//!
//! These tests verify:
//! - Text lines survive keys/values containing tabs, newlines and backslashes
//! - Malformed text lines are reported with their line number
//! - Binary frames detect checksum damage and truncation
//! - EventReader enforces strictly increasing sequence numbers

use std::io::Cursor;

use tlogkv::config::LoggerKind;
use tlogkv::error::{ErrorKind, KvError};
use tlogkv::tlog::binary::{encode_frame, read_frame, FRAME_HEADER_SIZE};
use tlogkv::tlog::text::{decode_line, encode_line};
use tlogkv::tlog::{Event, EventKind, EventReader};

// =============================================================================
// Helper Functions
// =============================================================================

fn text_log(events: &[Event]) -> Vec<u8> {
    events.iter().map(encode_line).collect::<String>().into_bytes()
}

fn binary_log(events: &[Event]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(&encode_frame(event).unwrap());
    }
    out
}

fn read_all(bytes: Vec<u8>, kind: LoggerKind) -> Result<Vec<Event>, KvError> {
    EventReader::new(Cursor::new(bytes), kind, 0).collect()
}

fn sample() -> Vec<Event> {
    vec![
        Event::put("a", "1").with_sequence(1),
        Event::put("b", "two words").with_sequence(2),
        Event::delete("a").with_sequence(3),
    ]
}

// =============================================================================
// Text Format Tests
// =============================================================================

#[test]
fn test_text_reads_back_in_order() {
    let events = read_all(text_log(&sample()), LoggerKind::File).unwrap();
    assert_eq!(events, sample());
}

#[test]
fn test_text_keeps_multi_word_values() {
    let line = encode_line(&Event::put("greeting", "hello there world").with_sequence(1));
    let event = decode_line(line.trim_end_matches('\n'), 1).unwrap();
    assert_eq!(event.value, "hello there world");
}

#[test]
fn test_text_escapes_separators() {
    let tricky = Event::put("tab\tkey", "line one\nline two\r\n\\back\\slash").with_sequence(9);
    let line = encode_line(&tricky);

    // exactly four fields on exactly one line
    assert!(line.ends_with('\n'));
    assert_eq!(line.trim_end_matches('\n').split('\t').count(), 4);
    assert!(!line.trim_end_matches('\n').contains('\n'));

    let events = read_all(line.into_bytes(), LoggerKind::File).unwrap();
    assert_eq!(events, vec![tricky]);
}

#[test]
fn test_text_last_line_without_newline() {
    let bytes = b"1\t1\ta\t1\n2\t1\tb\t2".to_vec();
    let events = read_all(bytes, LoggerKind::File).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].key, "b");
}

#[test]
fn test_text_empty_input() {
    assert!(read_all(Vec::new(), LoggerKind::File).unwrap().is_empty());
}

#[test]
fn test_text_wrong_field_count_reports_line() {
    let bytes = b"1\t1\ta\t1\n2\t1\tb\n".to_vec();
    let err = read_all(bytes, LoggerKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("line 2"), "{}", err);
}

#[test]
fn test_text_non_numeric_sequence() {
    let err = read_all(b"one\t1\ta\t1\n".to_vec(), LoggerKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_text_unknown_kind() {
    for bad in ["1\t0\ta\t1\n", "1\t3\ta\t1\n", "1\tput\ta\t1\n"] {
        let err = read_all(bad.as_bytes().to_vec(), LoggerKind::File).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "{:?}", bad);
    }
}

#[test]
fn test_text_invalid_escape() {
    let err = read_all(b"1\t1\ta\\q\t1\n".to_vec(), LoggerKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_text_blank_line_is_error() {
    let err = read_all(b"1\t1\ta\t1\n\n".to_vec(), LoggerKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_text_invalid_utf8_is_parse_error() {
    let mut bytes = b"1\t1\ta\t".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
    let err = read_all(bytes, LoggerKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_text_delete_value_is_ignored() {
    let events = read_all(b"1\t2\tk\tleftover\n".to_vec(), LoggerKind::File).unwrap();
    assert_eq!(events[0].kind, EventKind::Delete);
    assert_eq!(events[0].value, "");
}

// =============================================================================
// Binary Format Tests
// =============================================================================

#[test]
fn test_binary_reads_back_in_order() {
    let events = read_all(binary_log(&sample()), LoggerKind::Binary).unwrap();
    assert_eq!(events, sample());
}

#[test]
fn test_binary_handles_arbitrary_strings() {
    let tricky = Event::put("k\t\n\\", "v\r\n\0 emoji 🦀").with_sequence(1);
    let events = read_all(binary_log(&[tricky.clone()]), LoggerKind::Binary).unwrap();
    assert_eq!(events, vec![tricky]);
}

#[test]
fn test_binary_frame_size() {
    let frame = encode_frame(&Event::put("k", "v").with_sequence(1)).unwrap();
    let mut cursor = Cursor::new(frame.to_vec());
    let (_, size) = read_frame(&mut cursor, 0).unwrap().unwrap();
    assert_eq!(size as usize, frame.len());
    assert!(frame.len() > FRAME_HEADER_SIZE);
}

#[test]
fn test_binary_checksum_mismatch() {
    let mut bytes = binary_log(&sample());
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    let err = read_all(bytes, LoggerKind::Binary).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("checksum"), "{}", err);
}

#[test]
fn test_binary_truncated_tail() {
    let mut bytes = binary_log(&sample());
    bytes.truncate(bytes.len() - 3);

    let mut reader = EventReader::new(Cursor::new(bytes), LoggerKind::Binary, 0);
    assert!(reader.next_event().unwrap().is_some());
    assert!(reader.next_event().unwrap().is_some());
    let err = reader.next_event().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);

    // reader stays finished after an error
    assert!(reader.next_event().unwrap().is_none());
}

#[test]
fn test_binary_oversized_length() {
    let mut bytes = binary_log(&[Event::put("k", "v").with_sequence(1)]);
    bytes[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
    let err = read_all(bytes, LoggerKind::Binary).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

// =============================================================================
// Sequence Validation Tests
// =============================================================================

#[test]
fn test_duplicate_sequence_rejected() {
    let bytes = b"1\t1\ta\t1\n1\t1\tb\t2\n".to_vec();
    let err = read_all(bytes, LoggerKind::File).unwrap_err();
    match err {
        KvError::Sequence { last, found } => {
            assert_eq!(last, 1);
            assert_eq!(found, 1);
        }
        other => panic!("expected sequence error, got {}", other),
    }
}

#[test]
fn test_decreasing_sequence_rejected() {
    let events = vec![
        Event::put("a", "1").with_sequence(5),
        Event::put("b", "2").with_sequence(3),
    ];
    let err = read_all(binary_log(&events), LoggerKind::Binary).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sequence);
}

#[test]
fn test_gaps_are_allowed() {
    let events = vec![
        Event::put("a", "1").with_sequence(2),
        Event::put("b", "2").with_sequence(10),
    ];
    let mut reader = EventReader::new(Cursor::new(text_log(&events)), LoggerKind::File, 0);
    assert_eq!(reader.by_ref().count(), 2);
    assert_eq!(reader.last_sequence(), 10);
}

#[test]
fn test_zero_sequence_rejected() {
    let err = read_all(b"0\t1\ta\t1\n".to_vec(), LoggerKind::File).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sequence);
}
