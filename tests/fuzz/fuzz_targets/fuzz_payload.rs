#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Payload decoders must not panic on any input.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = covreport::payload::decode_report(s);
        let _ = covreport::payload::decode_source_file(s);
    }
});
