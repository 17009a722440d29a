#![no_main]

use libfuzzer_sys::fuzz_target;
use modelite_core::query::split_field_operator;
use modelite_core::{Filter, Operator};

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok((field, operator)) = split_field_operator(token) {
        assert!(!field.is_empty() || operator == Operator::Eq);
        assert_eq!(operator.as_str().parse::<Operator>().ok(), Some(operator));
    }
    if let Ok(filter) = Filter::parse(token, 1) {
        let _ = filter.to_string();
    }
});
