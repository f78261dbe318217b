//! Teleinfo group checksum.
//!
//! The checksum of an information group is computed over `LABEL SP VALUE`:
//! the code points are summed, the sum is truncated to its 6 low bits and
//! shifted by 0x20 so that the result is always a printable character.

use crate::constants::{TELEINFO_CHECKSUM_MASK, TELEINFO_CHECKSUM_OFFSET};

/// Computes the checksum character of `payload`.
pub fn checksum(payload: &str) -> char {
    let sum = payload
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_add(c as u32));
    let code = (sum & TELEINFO_CHECKSUM_MASK) + TELEINFO_CHECKSUM_OFFSET;
    // 0x20..=0x5F is always a valid scalar value
    char::from_u32(code).unwrap_or(' ')
}

/// Returns `true` if `checksum` is the checksum character of `payload`.
pub fn validate(payload: &str, checksum: char) -> bool {
    self::checksum(payload) == checksum
}
