//! Fuzz target for import path matching.

#![no_main]

use gopkg_types::{match_path, MatchOutcome, Site};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(MatchOutcome::Package(repo)) = match_path(path) {
        let site = Site::default();
        let _ = site.upstream_root(&repo);
        let _ = site.import_path(&repo);
        assert!(repo.subpath.is_empty() || repo.subpath.starts_with('/'));
    }
});
