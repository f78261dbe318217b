#![no_main]

use libfuzzer_sys::fuzz_target;
use teleinfo_rs::teleinfo::checksum::checksum;
use teleinfo_rs::teleinfo::line::decode_line;
use teleinfo_rs::FieldValue;

fuzz_target!(|data: &[u8]| {
    // Any input must decode or be rejected, never panic
    let _ = decode_line(data);

    // Text values are kept verbatim, so their group checksum is reproducible
    if let Ok(decoded) = decode_line(data) {
        if let FieldValue::Text(value) = &decoded.field.value {
            let payload = format!("{} {}", decoded.field.key, value);
            assert_eq!(checksum(&payload), decoded.checksum);
        }
    }

    // Same bytes with a valid terminator appended
    let mut terminated = data.to_vec();
    terminated.extend_from_slice(b"\r\n");
    let _ = decode_line(&terminated);
});
