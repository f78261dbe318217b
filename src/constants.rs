//! Teleinfo Protocol Constants
//!
//! This module defines constants used by the Teleinfo (TIC) historic mode
//! implementation, based on the Enedis NOI-CPT_02E specification.

/// Start of text: begins a frame, and ends the previous one
pub const TELEINFO_STX: u8 = 0x02;

/// End of text: closes a frame
pub const TELEINFO_ETX: u8 = 0x03;

/// Line feed, opens each information group on the wire
pub const TELEINFO_LF: u8 = 0x0A;

/// Separator between label, value and checksum in historic mode
pub const TELEINFO_SP: char = ' ';

/// Control sequence found between the last group of a frame and the next one
pub const TELEINFO_FRAME_BOUNDARY: &str = "\u{3}\u{2}";

/// Line terminator preceding the line feed
pub const TELEINFO_LINE_END: &str = "\r\n";

/// Mask applied to the payload sum before offsetting it into printable range
pub const TELEINFO_CHECKSUM_MASK: u32 = 0x3F;

/// Offset added to the masked sum
pub const TELEINFO_CHECKSUM_OFFSET: u32 = 0x20;

// ----------------------------------------------------------------------------
// Serial line defaults (historic mode: 1200 bauds, 7E1)
// ----------------------------------------------------------------------------

pub const TELEINFO_DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const TELEINFO_HISTORIC_BAUDRATE: u32 = 1200;
pub const TELEINFO_DEFAULT_TIMEOUT_MS: u64 = 1000;

// ----------------------------------------------------------------------------
// Storage defaults
// ----------------------------------------------------------------------------

pub const INFLUX_DEFAULT_HOST: &str = "localhost";
pub const INFLUX_DEFAULT_PORT: u16 = 8086;
pub const INFLUX_DEFAULT_DATABASE: &str = "teleinfo";
pub const INFLUX_DEFAULT_TAG_HOST: &str = "raspberry";
pub const INFLUX_DEFAULT_TAG_REGION: &str = "linky";
pub const INFLUX_DEFAULT_RETRY_SECS: u64 = 5;

/// Frames buffered between the reader loop and a sink task
pub const SINK_DEFAULT_QUEUE: usize = 16;
