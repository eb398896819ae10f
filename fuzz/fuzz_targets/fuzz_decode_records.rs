#![no_main]

use fvecarve_core::record::{decode_records, RECORD_HEADER_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(records) = decode_records(data) {
        let total: usize = records
            .iter()
            .map(|r| RECORD_HEADER_LEN + r.payload.len())
            .sum();
        assert_eq!(total, data.len());
    }
});
