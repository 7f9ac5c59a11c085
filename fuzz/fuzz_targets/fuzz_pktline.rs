//! Fuzz target for pkt-line framing.
//!
//! The cursor must never panic and every frame span must lie inside the
//! input.

#![no_main]

use gopkg_git::{PktLine, PktLineCursor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for frame in PktLineCursor::new(data) {
        let Ok(frame) = frame else { break };
        assert!(frame.span.end <= data.len());
        if let PktLine::Data(payload) = frame.line {
            assert_eq!(payload, &data[frame.span.start + 4..frame.span.end]);
        }
    }
});
