//! Fuzz testing for rate-limit key derivation.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_rate_limit_key
//! ```
//!
//! Feeds arbitrary `Authorization` and `X-Forwarded-For` values through key
//! extraction and checks it never panics or yields an empty key.

#![no_main]

use fortune_gateway::middleware::{extract_client_ip, rate_limit_key};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&[u8], &[u8])| {
    let (authorization, forwarded_for) = data;

    let mut builder = axum::http::Request::builder();
    if let Ok(value) = axum::http::HeaderValue::from_bytes(authorization) {
        builder = builder.header("authorization", value);
    }
    if let Ok(value) = axum::http::HeaderValue::from_bytes(forwarded_for) {
        builder = builder.header("x-forwarded-for", value);
    }

    let Ok(req) = builder.body(()) else {
        return;
    };

    assert!(!extract_client_ip(&req).is_empty());
    assert!(!rate_limit_key(&req).is_empty());
});
