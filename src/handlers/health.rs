//! Health and greeting endpoints.
//!
//! # Endpoints
//!
//! - `GET /` - Static greeting
//! - `GET /health` - Liveness check with version and uptime
//!
//! Both pass through the rate limiter like every other route.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::{HealthResponse, RootResponse};
use crate::state::AppState;

/// Health check endpoint.
///
/// Always returns 200 OK. `llm_configured` reports whether `/fortune` can
/// reach the provider, without making an upstream call.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "llm_configured": true,
///   "uptime_seconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_configured: state.config.llm_configured(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Root greeting.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Hello, world!".to_string(),
    })
}
