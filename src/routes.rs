//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Answers preflight, adds CORS headers (also to 429s)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Request Logger  │ ← X-Request-ID, X-Process-Time, start/end logs
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 if exceeded, X-RateLimit-* otherwise
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Body Limit     │ ← 413 past MAX_REQUEST_BODY_SIZE
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `GET /` - Greeting
//! - `GET /health` - Health check
//! - `POST /fortune` - Generate a fortune from three keywords

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::handlers;
use crate::middleware::{RateLimitLayer, RequestLoggerLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The rate limiter is taken from `state`, so every router built from clones
/// of the same state shares one limiter table.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/fortune", post(handlers::get_fortune));

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. Rate limiting
    info!(
        limit = state.limiter.limit(),
        period_secs = state.limiter.window().as_secs(),
        "Rate limiting enabled"
    );
    router = router.layer(RateLimitLayer::new(state.limiter.clone()));

    // 3. Request logging - wraps the limiter so timings include it
    router = router.layer(RequestLoggerLayer::new());

    // 4. CORS
    router = router.layer(cors);

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// `*` allows any origin; otherwise only the listed origins are allowed.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    }
}
