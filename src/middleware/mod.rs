//! HTTP middleware for request observability and admission control.
//!
//! - **Request Logger**: Request IDs, latency headers, structured start/end logs
//! - **Rate Limiting**: Sliding-window log per credential and client address
//!
//! # Architecture
//!
//! ```text
//! Request → Request Logger → Rate Limiter → Handler → Response
//!               ↓                 ↓
//!          X-Request-ID      429 Too Many Requests
//!          X-Process-Time    X-RateLimit-* headers
//! ```

pub mod ip;
pub mod rate_limit;
pub mod request_logger;

pub use ip::{UNKNOWN_IP, extract_client_ip};
pub use rate_limit::{RateLimitLayer, extract_credential, rate_limit_key};
pub use request_logger::{
    PROCESS_TIME_HEADER, REQUEST_ID_HEADER, RequestContext, RequestIdExt, RequestLoggerLayer,
};
