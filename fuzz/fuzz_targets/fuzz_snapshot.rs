#![no_main]

use libfuzzer_sys::fuzz_target;
use modelite_embedded::snapshot;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must be rejected, never panic
    let _ = snapshot::decode(data);
});
