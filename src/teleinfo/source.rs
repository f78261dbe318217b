//! # Teleinfo Serial Source
//!
//! This module provides the stream side of the reader: a [`LineSource`]
//! yields line-delimited chunks of the meter output, each read bounded by a
//! timeout so that the consumer loop regains control regularly.
//!
//! [`SerialLineSource`] works over any `AsyncRead`. In production it wraps a
//! `tokio_serial::SerialStream` opened with the historic-mode line settings
//! (1200 bauds, 7 data bits, even parity, 1 stop bit).

use crate::constants::{
    TELEINFO_DEFAULT_PORT, TELEINFO_DEFAULT_TIMEOUT_MS, TELEINFO_HISTORIC_BAUDRATE, TELEINFO_LF,
};
use crate::error::TeleinfoError;
use async_trait::async_trait;
use log::info;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_serial::SerialPortBuilderExt;

/// Outcome of a single read from a [`LineSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// One line, terminator included.
    Line(Vec<u8>),
    /// Nothing complete arrived before the read timeout.
    TimedOut,
    /// The source is exhausted.
    Closed,
}

/// Supplier of raw lines.
#[async_trait]
pub trait LineSource: Send {
    async fn read_line(&mut self) -> Result<LineRead, TeleinfoError>;
}

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baudrate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: TELEINFO_DEFAULT_PORT.to_string(),
            baudrate: TELEINFO_HISTORIC_BAUDRATE,
            timeout: Duration::from_millis(TELEINFO_DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Line source over a byte stream.
pub struct SerialLineSource<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    timeout: Duration,
}

impl<R: AsyncRead + Unpin + Send> SerialLineSource<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        SerialLineSource {
            reader: BufReader::new(inner),
            pending: Vec::with_capacity(64),
            timeout,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for SerialLineSource<R> {
    async fn read_line(&mut self) -> Result<LineRead, TeleinfoError> {
        // `read_until` appends to `pending` as bytes arrive, so a timeout or a
        // cancelled read keeps the partial line for the next call.
        let read = tokio::time::timeout(
            self.timeout,
            self.reader.read_until(TELEINFO_LF, &mut self.pending),
        )
        .await;

        match read {
            Err(_) => Ok(LineRead::TimedOut),
            Ok(Err(e)) => Err(TeleinfoError::Io(e)),
            Ok(Ok(0)) if self.pending.is_empty() => Ok(LineRead::Closed),
            Ok(Ok(_)) => Ok(LineRead::Line(std::mem::take(&mut self.pending))),
        }
    }
}

/// Opens the serial port described by `config`.
pub fn open_serial(
    config: &SerialConfig,
) -> Result<SerialLineSource<tokio_serial::SerialStream>, TeleinfoError> {
    if config.timeout.is_zero() {
        return Err(TeleinfoError::InvalidConfig(
            "serial read timeout must be non-zero".into(),
        ));
    }

    let port = tokio_serial::new(&config.port, config.baudrate)
        .data_bits(tokio_serial::DataBits::Seven)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::Even)
        .timeout(config.timeout)
        .open_native_async()
        .map_err(|e| TeleinfoError::SerialPortError(format!("{}: {e}", config.port)))?;

    info!(
        "Teleinfo is reading on {} at {} bauds",
        config.port, config.baudrate
    );
    Ok(SerialLineSource::new(port, config.timeout))
}
