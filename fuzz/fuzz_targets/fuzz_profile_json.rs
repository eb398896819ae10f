#![no_main]

use fvecarve_core::{scan_bytes, Profile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(profile) = Profile::from_json(text) {
        let _ = scan_bytes(b"-FVE-FS-\x00\x00\x00\x00\x04\x80\x00\x00", &profile);
    }
});
