//! # Fortune Gateway
//!
//! A small Axum service that turns three keywords into an emoji-laden
//! fortune via an LLM provider, featuring:
//!
//! - **Admission control**: Per-client sliding-window-log rate limiting
//!   with standard `Retry-After` / `X-RateLimit-*` headers
//! - **Observability**: Request IDs, latency headers, structured logging,
//!   Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (CORS → Request Logger → Rate Limit)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (root, health, fortune)                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FortuneTeller (XaiClient)                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  xAI chat-completions API                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fortune_gateway::{AppState, Config, XaiClient, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let teller = Arc::new(XaiClient::from_config(&config)?);
//!
//!     let state = AppState::new(config, teller)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Rate Limit Configuration
//!
//! ```bash
//! API_RATE_LIMIT=100 API_RATE_LIMIT_PERIOD=3600 cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use limiter::{Decision, RateLimitError, SlidingWindowLimiter};
pub use llm::{FortuneTeller, XaiClient};
pub use routes::build_router;
pub use state::AppState;
