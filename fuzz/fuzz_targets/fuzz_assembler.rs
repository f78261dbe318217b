#![no_main]

use libfuzzer_sys::fuzz_target;
use teleinfo_rs::FrameAssembler;

fuzz_target!(|data: &[u8]| {
    let mut assembler = FrameAssembler::new();
    let mut frames = 0u64;

    for line in data.split_inclusive(|b| *b == b'\n') {
        if let Some(frame) = assembler.push_line(line) {
            frames += 1;
            assert!(!frame.contains_key("ADCO"));
        }
    }

    let stats = assembler.stats();
    assert_eq!(stats.frames_emitted, frames);
    assert!(stats.fields_accepted + stats.lines_rejected() + stats.lines_before_sync <= data.len() as u64);
});
