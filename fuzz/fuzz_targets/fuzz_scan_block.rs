#![no_main]

use fvecarve_core::{scan_bytes, Carver, Profile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u16, &[u8])| {
    let (split, data) = input;
    let chunk = usize::from(split).max(1);

    for profile in Profile::builtin() {
        let Ok((expected, _)) = scan_bytes(data, &profile) else {
            return;
        };

        let mut streamed = Vec::new();
        let Ok(mut carver) = Carver::new(&profile) else {
            return;
        };
        for piece in data.chunks(chunk) {
            let _ = carver.feed(piece, |key| {
                streamed.push(key);
                Ok(())
            });
        }
        let _ = carver.finish(|key| {
            streamed.push(key);
            Ok(())
        });

        assert_eq!(streamed, expected);
    }
});
