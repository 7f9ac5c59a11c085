//! Fuzz target for advertisement rewriting.
//!
//! The first byte picks the requested major; the rest is the advertisement.

#![no_main]

use gopkg_git::{rewrite_advertisement, PktLineCursor};
use gopkg_types::Version;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&major, advert)) = data.split_first() else {
        return;
    };
    let requested = Version::major(u32::from(major % 4));

    if let Ok(out) = rewrite_advertisement(advert, &requested) {
        // Output must stay well framed.
        for frame in PktLineCursor::new(&out.advertisement) {
            assert!(frame.is_ok());
        }
    }
});
