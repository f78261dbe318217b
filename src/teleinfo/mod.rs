//! The teleinfo module contains the protocol core: checksum, label
//! vocabulary, line decoding, frame assembly, and the serial line source.

pub mod assembler;
pub mod checksum;
pub mod frame;
pub mod label;
pub mod line;
pub mod serial_mock;
pub mod source;

pub use assembler::{AssemblerState, AssemblerStats, FrameAssembler};
pub use frame::{Field, FieldValue, Frame};
pub use label::{Label, ValueKind};
pub use line::{decode_line, encode_line, DecodedLine};
pub use source::{open_serial, LineRead, LineSource, SerialConfig, SerialLineSource};
