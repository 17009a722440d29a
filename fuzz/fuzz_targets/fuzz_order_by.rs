#![no_main]

use libfuzzer_sys::fuzz_target;
use modelite_core::query::parse_order_spec;

fuzz_target!(|data: &[u8]| {
    let Ok(spec) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(clauses) = parse_order_spec(spec) {
        // A rendered ordering parses back to itself
        let rendered: Vec<String> = clauses.iter().map(|c| c.to_string()).collect();
        if let Ok(again) = parse_order_spec(&rendered.join(", ")) {
            assert_eq!(again, clauses);
        }
    }
});
