//! Tests for the line decoder: typed values, checksum failures and the
//! positional checksum contract.

use teleinfo_rs::teleinfo::checksum::checksum;
use teleinfo_rs::teleinfo::line::encode_line;
use teleinfo_rs::{decode_line, DecodeError, Field, FieldValue, Label, ValueKind};

fn line_with_checksum(payload: &str, c: char) -> Vec<u8> {
    format!("{payload} {c}\r\n").into_bytes()
}

/// Tests that a numeric label is coerced to an integer.
#[test]
fn test_decode_iinst() {
    let raw = line_with_checksum("IINST 005", checksum("IINST 005"));
    let decoded = decode_line(&raw).unwrap();
    assert_eq!(decoded.field, Field::new("IINST", 5i64));
}

/// Tests that a text label keeps its value untouched.
#[test]
fn test_decode_ptec() {
    let raw = line_with_checksum("PTEC HP..", checksum("PTEC HP.."));
    let decoded = decode_line(&raw).unwrap();
    assert_eq!(decoded.field.key, "PTEC");
    assert_eq!(decoded.field.value, FieldValue::Text("HP..".to_string()));
}

/// Tests that every numeric label is parsed as an integer, and every other
/// label as text, whatever the value looks like.
#[test]
fn test_value_kind_follows_label() {
    for label in Label::ALL {
        let decoded = decode_line(&encode_line(label.as_str(), "000042")).unwrap();
        match label.kind() {
            ValueKind::Integer => assert_eq!(decoded.field.value, FieldValue::Integer(42)),
            ValueKind::Text => {
                assert_eq!(decoded.field.value, FieldValue::Text("000042".to_string()))
            }
        }
    }

    let decoded = decode_line(&encode_line("PEJP", "30")).unwrap();
    assert_eq!(decoded.field.value, FieldValue::Text("30".to_string()));
}

/// Tests that a wrong checksum character is reported with its context.
#[test]
fn test_wrong_checksum() {
    let good = checksum("PAPP 01289");
    let bad = if good == '#' { '$' } else { '#' };
    let err = decode_line(&line_with_checksum("PAPP 01289", bad)).unwrap_err();

    match err {
        DecodeError::ChecksumMismatch {
            key,
            value,
            expected,
            received,
        } => {
            assert_eq!(key, "PAPP");
            assert_eq!(value, "01289");
            assert_eq!(expected, good);
            assert_eq!(received, bad);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

/// Tests that only the first two tokens are used.
#[test]
fn test_extra_tokens_are_ignored() {
    // Checksum is computed over `HHPHC A` only
    let raw = format!("HHPHC A {}\r\n", checksum("HHPHC A"));
    assert_eq!(decode_line(raw.as_bytes()).unwrap().field, Field::new("HHPHC", "A"));
}

/// Tests the boundary sequence carried by the last group of a frame.
#[test]
fn test_group_followed_by_frame_boundary() {
    let mut raw = b"MOTDETAT 000000 ".to_vec();
    raw.push(checksum("MOTDETAT 000000") as u8);
    raw.extend_from_slice(b"\x03\x02\r\n");
    let decoded = decode_line(&raw).unwrap();
    assert_eq!(decoded.field, Field::new("MOTDETAT", "000000"));
}

/// Tests that a line whose terminator differs is not decoded at a shifted
/// offset.
#[test]
fn test_unexpected_terminator_is_malformed() {
    let mut raw = encode_line("IMAX", "007");
    raw.insert(raw.len() - 2, b'\r');
    assert!(matches!(decode_line(&raw), Err(DecodeError::MalformedLine(_))));
}

/// Tests that a numeric label with text is a coercion failure, not a
/// checksum failure.
#[test]
fn test_coercion_failure() {
    let err = decode_line(&encode_line("ISOUSC", "4S")).unwrap_err();
    assert_eq!(
        err,
        DecodeError::TypeCoercionError {
            key: "ISOUSC".to_string(),
            value: "4S".to_string()
        }
    );
}
