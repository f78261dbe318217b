//! # Teleinfo Error Handling
//!
//! This module defines the two error types of the crate:
//!
//! - [`DecodeError`]: line-local failures raised while decoding a single
//!   Teleinfo line. They never abort frame assembly; the offending line is
//!   dropped and the next line is processed.
//! - [`TeleinfoError`]: failures of the surrounding I/O (serial port, sinks,
//!   configuration) that callers have to handle.

use thiserror::Error;

/// Failure to turn one raw line into a validated field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The line bytes are not valid UTF-8 text.
    #[error("Invalid line encoding: {0}")]
    EncodingError(String),

    /// The line does not follow the `KEY SP VALUE SP CHECKSUM CR LF` layout.
    #[error("Malformed line: {0}")]
    MalformedLine(String),

    /// The trailing checksum character does not match the payload.
    #[error("Checksum mismatch for `{key} {value}`: expected `{expected}`, received `{received}`")]
    ChecksumMismatch {
        key: String,
        value: String,
        expected: char,
        received: char,
    },

    /// A numeric label carries a value that is not an integer.
    #[error("Non-numeric value `{value}` for numeric label {key}")]
    TypeCoercionError { key: String, value: String },
}

/// Represents the different error types that can occur in the Teleinfo crate.
#[derive(Debug, Error)]
pub enum TeleinfoError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Underlying I/O failure of a stream source or sink.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame sink rejected or failed to persist a frame.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// A sink could not reach its backend within the allowed attempts.
    #[error("Connection to {target} failed after {attempts} attempt(s)")]
    ConnectionFailed { target: String, attempts: u32 },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A line decoding failure surfaced as a hard error.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<tokio_serial::Error> for TeleinfoError {
    fn from(e: tokio_serial::Error) -> Self {
        TeleinfoError::SerialPortError(e.to_string())
    }
}

impl From<serde_json::Error> for TeleinfoError {
    fn from(e: serde_json::Error) -> Self {
        TeleinfoError::SinkError(e.to_string())
    }
}
