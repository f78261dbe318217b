//! # Teleinfo Frame Assembler
//!
//! Rebuilds frames from the line-delimited byte stream of a meter. A line
//! carrying the STX control byte marks a frame boundary: it closes the frame
//! being accumulated and opens the next one. Lines seen before the first
//! boundary belong to a frame whose beginning was missed and are ignored.
//!
//! Lines that fail to decode are dropped; the frame they belonged to is still
//! emitted with the fields that did decode.

use crate::constants::TELEINFO_STX;
use crate::error::DecodeError;
use crate::logging::{log_line_hex, LogThrottle};
use crate::teleinfo::frame::{FieldValue, Frame};
use crate::teleinfo::label::Label;
use crate::teleinfo::line::decode_line;
use log::{debug, info, warn};

/// State of the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for the first STX of the stream.
    AwaitingFrameStart,
    /// Collecting fields until the next STX.
    AccumulatingFrame,
}

/// Counters kept by the assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub frames_emitted: u64,
    pub fields_accepted: u64,
    /// Lines dropped while waiting for the first frame boundary.
    pub lines_before_sync: u64,
    pub encoding_errors: u64,
    pub malformed_lines: u64,
    pub checksum_mismatches: u64,
    pub coercion_errors: u64,
}

impl AssemblerStats {
    /// Number of lines dropped because they failed to decode.
    pub fn lines_rejected(&self) -> u64 {
        self.encoding_errors + self.malformed_lines + self.checksum_mismatches + self.coercion_errors
    }

    fn record(&mut self, error: &DecodeError) {
        match error {
            DecodeError::EncodingError(_) => self.encoding_errors += 1,
            DecodeError::MalformedLine(_) => self.malformed_lines += 1,
            DecodeError::ChecksumMismatch { .. } => self.checksum_mismatches += 1,
            DecodeError::TypeCoercionError { .. } => self.coercion_errors += 1,
        }
    }
}

/// Line-by-line frame assembler.
#[derive(Debug)]
pub struct FrameAssembler {
    state: AssemblerState,
    current: Frame,
    meter_address: Option<FieldValue>,
    stats: AssemblerStats,
    throttle: LogThrottle,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_throttle(LogThrottle::default())
    }

    /// Creates an assembler whose rejection warnings go through `throttle`.
    pub fn with_throttle(throttle: LogThrottle) -> Self {
        FrameAssembler {
            state: AssemblerState::AwaitingFrameStart,
            current: Frame::new(),
            meter_address: None,
            stats: AssemblerStats::default(),
            throttle,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn stats(&self) -> &AssemblerStats {
        &self.stats
    }

    /// Address (`ADCO`) of the meter seen in the last completed frame.
    pub fn meter_address(&self) -> Option<&FieldValue> {
        self.meter_address.as_ref()
    }

    /// Number of fields accumulated so far in the frame being built.
    pub fn pending_fields(&self) -> usize {
        self.current.len()
    }

    /// Feeds one raw line. Returns the completed frame when `raw` carries a
    /// frame boundary.
    pub fn push_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let boundary = raw.contains(&TELEINFO_STX);

        match self.state {
            AssemblerState::AwaitingFrameStart => {
                if boundary {
                    debug!("Frame start detected, synchronized with the stream");
                    self.state = AssemblerState::AccumulatingFrame;
                    self.current = Frame::new();
                } else {
                    self.stats.lines_before_sync += 1;
                }
                None
            }
            AssemblerState::AccumulatingFrame if boundary => Some(self.complete_frame()),
            AssemblerState::AccumulatingFrame => {
                self.accumulate(raw);
                None
            }
        }
    }

    fn accumulate(&mut self, raw: &[u8]) {
        match decode_line(raw) {
            Ok(decoded) => {
                self.stats.fields_accepted += 1;
                self.current.insert(decoded.field);
            }
            Err(e) => {
                self.stats.record(&e);
                if self.throttle.allow() {
                    warn!("Dropping line: {e}");
                } else {
                    debug!("Dropping line: {e}");
                }
                if matches!(e, DecodeError::EncodingError(_)) {
                    log_line_hex("Undecodable line", raw);
                }
            }
        }
    }

    fn complete_frame(&mut self) -> Frame {
        let mut frame = std::mem::take(&mut self.current);

        if let Some(address) = frame.remove(Label::Adco.as_str()) {
            match &self.meter_address {
                Some(previous) if *previous != address => {
                    warn!("Meter address changed from {previous} to {address}");
                }
                None => info!("Reading meter {address}"),
                _ => {}
            }
            self.meter_address = Some(address);
        }

        self.stats.frames_emitted += 1;
        debug!("Frame complete with {} field(s)", frame.len());
        frame
    }
}
