//! Fuzz testing for fortune keyword validation.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_keywords -- -max_total_time=60
//! ```
//!
//! Checks that `validate_keywords` never panics and that anything it accepts
//! is trimmed, non-empty and within the length limit.

#![no_main]

use arbitrary::Arbitrary;
use fortune_gateway::validation::{MAX_KEYWORD_LENGTH, REQUIRED_KEYWORDS, validate_keywords};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    keywords: Vec<String>,
}

fuzz_target!(|input: Input| {
    if let Ok(accepted) = validate_keywords(&input.keywords) {
        assert_eq!(accepted.len(), REQUIRED_KEYWORDS);
        for keyword in &accepted {
            assert!(!keyword.is_empty());
            assert_eq!(keyword.trim(), keyword);
            assert!(keyword.chars().count() <= MAX_KEYWORD_LENGTH);
        }
    }
});
