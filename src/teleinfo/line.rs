//! # Teleinfo Line Decoder
//!
//! Decodes one information group of a historic-mode frame:
//!
//! ```text
//! LABEL SP VALUE SP CHECKSUM CR LF
//! ```
//!
//! The checksum sits at a fixed offset from the end of the line, after the
//! `ETX STX` boundary sequence has been removed. The checksum character can
//! itself be a space, so the label and value are the first two tokens of a
//! split on spaces and any further token is ignored.
//!
//! ```rust
//! use teleinfo_rs::teleinfo::line::{decode_line, encode_line};
//! use teleinfo_rs::teleinfo::frame::FieldValue;
//!
//! let raw = encode_line("IINST", "005");
//! let decoded = decode_line(&raw).unwrap();
//! assert_eq!(decoded.field.key, "IINST");
//! assert_eq!(decoded.field.value, FieldValue::Integer(5));
//! ```

use crate::constants::{TELEINFO_FRAME_BOUNDARY, TELEINFO_LINE_END, TELEINFO_SP};
use crate::error::DecodeError;
use crate::teleinfo::checksum::{checksum, validate};
use crate::teleinfo::frame::{Field, FieldValue};
use crate::teleinfo::label::{value_kind, ValueKind};

/// A validated field together with the checksum it was received with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub field: Field,
    pub checksum: char,
}

/// Decodes one raw line into a typed [`Field`].
pub fn decode_line(raw: &[u8]) -> Result<DecodedLine, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::EncodingError(e.to_string()))?;

    let mut tokens = text.split(TELEINFO_SP);
    let (key, value) = match (tokens.next(), tokens.next()) {
        (Some(key), Some(value)) if !key.is_empty() => (key, value),
        _ => {
            return Err(DecodeError::MalformedLine(format!(
                "expected `LABEL VALUE CHECKSUM`, got {text:?}"
            )))
        }
    };

    let received = extract_checksum(text)?;
    let payload = format!("{key}{TELEINFO_SP}{value}");
    if !validate(&payload, received) {
        return Err(DecodeError::ChecksumMismatch {
            key: key.to_string(),
            value: value.to_string(),
            expected: checksum(&payload),
            received,
        });
    }

    let value = match value_kind(key) {
        ValueKind::Integer => {
            FieldValue::Integer(value.parse::<i64>().map_err(|_| DecodeError::TypeCoercionError {
                key: key.to_string(),
                value: value.to_string(),
            })?)
        }
        ValueKind::Text => FieldValue::Text(value.to_string()),
    };

    Ok(DecodedLine {
        field: Field {
            key: key.to_string(),
            value,
        },
        checksum: received,
    })
}

/// Reads the checksum character three positions from the end of the line.
///
/// The offset is only trusted when the surrounding bytes are the ones the
/// protocol puts there: a separator before, `CR LF` after.
fn extract_checksum(text: &str) -> Result<char, DecodeError> {
    let stripped = text.replace(TELEINFO_FRAME_BOUNDARY, "");
    let body = stripped.strip_suffix(TELEINFO_LINE_END).ok_or_else(|| {
        DecodeError::MalformedLine(format!("missing CR LF terminator in {text:?}"))
    })?;

    let mut tail = body.chars().rev();
    match (tail.next(), tail.next()) {
        (Some(c), Some(TELEINFO_SP)) => Ok(c),
        _ => Err(DecodeError::MalformedLine(format!(
            "no checksum at the expected position in {text:?}"
        ))),
    }
}

/// Encodes a field as it appears on the wire, checksum and terminator
/// included.
pub fn encode_line(key: &str, value: &str) -> Vec<u8> {
    let payload = format!("{key}{TELEINFO_SP}{value}");
    let c = checksum(&payload);
    format!("{payload}{TELEINFO_SP}{c}{TELEINFO_LINE_END}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_numeric_label() {
        let decoded = decode_line(b"IINST 005 \\\r\n").unwrap();
        assert_eq!(decoded.field, Field::new("IINST", 5i64));
        assert_eq!(decoded.checksum, '\\');
    }

    #[test]
    fn test_decode_text_label_keeps_value() {
        let decoded = decode_line(b"OPTARIF HC.. <\r\n").unwrap();
        assert_eq!(decoded.field.value, FieldValue::Text("HC..".into()));
    }

    #[test]
    fn test_space_checksum() {
        // `PTEC HP..` sums to a space: the line splits into four tokens.
        let decoded = decode_line(b"PTEC HP..  \r\n").unwrap();
        assert_eq!(decoded.field, Field::new("PTEC", "HP.."));
        assert_eq!(decoded.checksum, ' ');
    }

    #[test]
    fn test_frame_boundary_is_stripped() {
        let decoded = decode_line(b"PTEC TH.. $\x03\x02\r\n").unwrap();
        assert_eq!(decoded.field, Field::new("PTEC", "TH.."));
    }

    #[test]
    fn test_bad_checksum() {
        let err = decode_line(b"IINST 005 X\r\n").unwrap_err();
        assert_eq!(
            err,
            DecodeError::ChecksumMismatch {
                key: "IINST".into(),
                value: "005".into(),
                expected: '\\',
                received: 'X',
            }
        );
    }

    #[test]
    fn test_non_numeric_value_for_numeric_label() {
        let raw = encode_line("PAPP", "01A89");
        assert!(matches!(
            decode_line(&raw),
            Err(DecodeError::TypeCoercionError { ref key, ref value })
                if key == "PAPP" && value == "01A89"
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            decode_line(&[0x49, 0xFF, 0x20, 0x30, 0x0D, 0x0A]),
            Err(DecodeError::EncodingError(_))
        ));
    }

    #[test]
    fn test_malformed_lines() {
        let cases: [&[u8]; 6] = [
            b"\r\n",
            b"GARBAGE\r\n",
            b" 005 X\r\n",
            // terminator missing: the offset would land elsewhere
            b"IINST 005 \\",
            b"IINST 005 \\\n",
            // no separator before the checksum
            b"IINST 005\\\r\n",
        ];
        for raw in cases {
            assert!(
                matches!(decode_line(raw), Err(DecodeError::MalformedLine(_))),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_encode_line_layout() {
        assert_eq!(encode_line("IMAX", "007"), b"IMAX 007 F\r\n".to_vec());
    }
}
