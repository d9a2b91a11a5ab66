//! Fuzz testing for payload validation and sanitization.
//!
//! Properties checked on arbitrary input:
//!
//! - `validate_string` and `validate_payload` never panic
//! - `sanitize_string` never panics and is idempotent:
//!   `sanitize(sanitize(x)) == sanitize(x)` for every input
//! - `sanitize_payload` preserves the JSON structure of non-string values
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use game_catalog_api::validation::{
    game_numeric_rules, sanitize_payload, sanitize_string, validate_payload, validate_string,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_string(s, "field");

        let once = sanitize_string(s);
        let twice = sanitize_string(&once);
        assert_eq!(once, twice, "sanitize_string must be idempotent");

        // Arbitrary JSON documents through the payload path
        if let Ok(payload) = serde_json::from_str::<serde_json::Value>(s) {
            let _ = validate_payload(&payload, game_numeric_rules());

            let sanitized_once = sanitize_payload(&payload);
            let sanitized_twice = sanitize_payload(&sanitized_once);
            assert_eq!(
                sanitized_once, sanitized_twice,
                "sanitize_payload must be idempotent"
            );
        }
    }
});
