//! # teleinfo-rs - A Rust Crate for French Teleinfo (TIC) Meter Readings
//!
//! Electricity meters deployed in France (CBE, CBEMM, Linky in historic mode)
//! continuously emit their state on a 1200 bauds serial line called
//! "téléinformation client". This crate reconstructs validated frames from
//! that byte stream and persists them to a time-series store.
//!
//! ## Features
//!
//! - Checksum validation of every information group
//! - Typed field values: integers for the index/current/power labels, text
//!   for the others
//! - Frame assembly that survives corrupted lines and never emits a partial
//!   frame on shutdown
//! - Serial port source with read timeouts, built on `tokio-serial`
//! - InfluxDB and JSON-lines sinks, decoupled from the reader by a bounded
//!   queue
//!
//! ## Usage
//!
//! ```rust,no_run
//! use teleinfo_rs::{
//!     open_serial, InfluxConfig, InfluxSink, ReaderConfig, SerialConfig, SinkHandle,
//!     TeleinfoReader,
//! };
//!
//! # async fn example() -> Result<(), teleinfo_rs::TeleinfoError> {
//! let source = open_serial(&SerialConfig::default())?;
//! let sink = InfluxSink::connect(InfluxConfig::default()).await?;
//! let handle = SinkHandle::spawn(sink, 16);
//!
//! let (_stop, shutdown) = tokio::sync::oneshot::channel();
//! let mut reader = TeleinfoReader::new(source, ReaderConfig::default());
//! reader.run(&handle, shutdown).await?;
//! handle.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod reader;
pub mod sink;
pub mod teleinfo;

pub use crate::error::{DecodeError, TeleinfoError};
pub use crate::logging::{init_logger, log_info};

// Protocol core
pub use teleinfo::{
    AssemblerState, AssemblerStats, DecodedLine, Field, FieldValue, Frame, FrameAssembler, Label,
    ValueKind,
};

// Stream side
pub use teleinfo::{LineRead, LineSource, SerialConfig, SerialLineSource};

// Storage side
pub use sink::{
    FrameSink, InfluxConfig, InfluxSink, JsonLinesSink, MemorySink, SinkHandle, SinkStats,
    TimestampedFrame,
};

pub use reader::{ReaderConfig, ReaderStats, TeleinfoReader};

/// Validates a Teleinfo checksum.
///
/// # Arguments
/// * `payload` - `LABEL SP VALUE` text the checksum was computed over
/// * `checksum` - Checksum character received on the line
///
/// # Returns
/// * `true` if the checksum matches the payload
pub fn validate_checksum(payload: &str, checksum: char) -> bool {
    teleinfo::checksum::validate(payload, checksum)
}

/// Decodes one raw Teleinfo line.
///
/// # Arguments
/// * `raw` - Line bytes, terminator included
///
/// # Returns
/// * `Ok(DecodedLine)` - Validated and typed field
/// * `Err(DecodeError)` - The line must be skipped
pub fn decode_line(raw: &[u8]) -> Result<DecodedLine, DecodeError> {
    teleinfo::line::decode_line(raw)
}

/// Opens the meter serial port.
///
/// # Arguments
/// * `config` - Port path, baud rate and read timeout
///
/// # Returns
/// * `Ok(SerialLineSource)` - Line source reading from the port
/// * `Err(TeleinfoError)` - The port could not be opened
pub fn open_serial(
    config: &SerialConfig,
) -> Result<SerialLineSource<tokio_serial::SerialStream>, TeleinfoError> {
    teleinfo::source::open_serial(config)
}
