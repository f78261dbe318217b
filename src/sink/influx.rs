//! # InfluxDB Sink
//!
//! Writes frames to an InfluxDB 1.x server over its HTTP API. Every field of
//! a frame becomes its own point: the measurement is the label, the point
//! carries the configured tags and a single `value` field, and is stamped
//! with the frame receipt time in seconds.
//!
//! ```text
//! PAPP,host=raspberry,region=linky value=1289i 1704164645
//! PTEC,host=raspberry,region=linky value="HP.." 1704164645
//! ```
//!
//! [`InfluxSink::connect`] makes sure the database exists before the first
//! write, retrying until the server answers.

use crate::constants::{
    INFLUX_DEFAULT_DATABASE, INFLUX_DEFAULT_HOST, INFLUX_DEFAULT_PORT, INFLUX_DEFAULT_RETRY_SECS,
    INFLUX_DEFAULT_TAG_HOST, INFLUX_DEFAULT_TAG_REGION,
};
use crate::error::TeleinfoError;
use crate::sink::{FrameSink, TimestampedFrame};
use crate::teleinfo::frame::FieldValue;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Connection and tagging settings of the InfluxDB sink.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Tags added to every point, in order.
    pub tags: Vec<(String, String)>,
    /// Pause between two connection attempts.
    pub retry_delay: Duration,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    pub request_timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        InfluxConfig {
            host: INFLUX_DEFAULT_HOST.to_string(),
            port: INFLUX_DEFAULT_PORT,
            database: INFLUX_DEFAULT_DATABASE.to_string(),
            tags: vec![
                ("host".to_string(), INFLUX_DEFAULT_TAG_HOST.to_string()),
                ("region".to_string(), INFLUX_DEFAULT_TAG_REGION.to_string()),
            ],
            retry_delay: Duration::from_secs(INFLUX_DEFAULT_RETRY_SECS),
            max_attempts: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl InfluxConfig {
    fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

pub struct InfluxSink {
    config: InfluxConfig,
}

impl InfluxSink {
    /// Creates the database if needed, retrying every `retry_delay` until
    /// the server answers or `max_attempts` is reached.
    pub async fn connect(config: InfluxConfig) -> Result<Self, TeleinfoError> {
        if config.database.is_empty() {
            return Err(TeleinfoError::InvalidConfig("database name is empty".into()));
        }

        let sink = InfluxSink { config };
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!(
                "Ensuring database {} exists (attempt {attempt})",
                sink.config.database
            );
            match sink.create_database().await {
                Ok(()) => {
                    info!("Connected to {}", sink.config.target());
                    return Ok(sink);
                }
                Err(e) => {
                    if matches!(sink.config.max_attempts, Some(max) if attempt >= max) {
                        return Err(TeleinfoError::ConnectionFailed {
                            target: sink.config.target(),
                            attempts: attempt,
                        });
                    }
                    warn!(
                        "InfluxDB is not reachable ({e}). Waiting {:?} to retry.",
                        sink.config.retry_delay
                    );
                    tokio::time::sleep(sink.config.retry_delay).await;
                }
            }
        }
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    async fn create_database(&self) -> Result<(), TeleinfoError> {
        let query = format!("CREATE DATABASE \"{}\"", self.config.database);
        self.post(&format!("/query?q={}", percent_encode(&query)), "")
            .await
    }

    async fn post(&self, target: &str, body: &str) -> Result<(), TeleinfoError> {
        let request = format!(
            "POST {target} HTTP/1.1\r\n\
             Host: {}:{}\r\n\
             User-Agent: teleinfo-rs\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            self.config.host,
            self.config.port,
            body.len()
        );

        let exchange = async {
            let mut stream =
                TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
            stream.write_all(request.as_bytes()).await?;
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await?;
            Ok::<_, std::io::Error>(response)
        };

        let response = tokio::time::timeout(self.config.request_timeout, exchange)
            .await
            .map_err(|_| TeleinfoError::SinkError(format!("{target}: request timed out")))??;

        let status = parse_status(&response)?;
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(TeleinfoError::SinkError(format!(
                "{target}: HTTP {status}: {}",
                response_body(&response).trim()
            )))
        }
    }
}

#[async_trait]
impl FrameSink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn write_frame(&mut self, frame: &TimestampedFrame) -> Result<(), TeleinfoError> {
        if frame.frame.is_empty() {
            debug!("Skipping empty frame");
            return Ok(());
        }
        let body = to_line_protocol(frame, &self.config.tags);
        let target = format!(
            "/write?db={}&precision=s",
            percent_encode(&self.config.database)
        );
        self.post(&target, &body).await
    }
}

/// Renders a frame as InfluxDB line protocol, one point per field.
pub fn to_line_protocol(frame: &TimestampedFrame, tags: &[(String, String)]) -> String {
    let timestamp = frame.received_at.timestamp();
    let tag_set: String = tags
        .iter()
        .map(|(k, v)| format!(",{}={}", escape_tag(k), escape_tag(v)))
        .collect();

    frame
        .frame
        .iter()
        .map(|(key, value)| {
            let value = match value {
                FieldValue::Integer(v) => format!("{v}i"),
                FieldValue::Text(s) => format!("\"{}\"", escape_string_field(s)),
            };
            format!(
                "{}{tag_set} value={value} {timestamp}",
                escape_measurement(key)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

fn escape_tag(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape_string_field(s: &str) -> String {
    escape(s, &['"', '\\'])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Percent-encodes everything but RFC 3986 unreserved characters.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn parse_status(response: &[u8]) -> Result<u16, TeleinfoError> {
    let text = String::from_utf8_lossy(response);
    text.lines()
        .next()
        .and_then(|status_line| status_line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| {
            TeleinfoError::SinkError(format!(
                "unexpected HTTP response: {:?}",
                text.chars().take(64).collect::<String>()
            ))
        })
}

fn response_body(response: &[u8]) -> String {
    let text = String::from_utf8_lossy(response);
    text.split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default()
}
