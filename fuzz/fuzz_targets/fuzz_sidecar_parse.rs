//! Fuzz target for sidecar parsing
//!
//! Sidecars are read from disk and may have been edited by hand. Parsing must
//! never panic, and rendering a parsed record must parse back to itself.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sharebox_core::SidecarRecord;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let record = SidecarRecord::parse(text);
    assert!(!record.checksum.contains('\n'), "checksum must be a single line");

    let reparsed = SidecarRecord::parse(&record.render());
    assert_eq!(record, reparsed, "render/parse must be stable");
});
