use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Upstream Errors
///
/// Failures talking to the LLM provider are split so clients can tell a slow
/// provider (`UpstreamTimeout`, 504) from a broken one (`Upstream`, 502).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upstream LLM request failed: {0}")]
    Upstream(String),

    #[error("Upstream LLM request timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Full details stay in the server log; clients get sanitized messages.
        tracing::error!(error = %self, "Request failed");

        let (status, error_type, message) = match &self {
            AppError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "The fortune teller is unavailable right now. Please try again.",
            ),
            AppError::UpstreamTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "upstream_timeout",
                "The fortune teller took too long to answer. Please try again.",
            ),
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Service configuration error. Please contact support.",
            ),

            // Client errors - the message is user-facing
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.as_str()),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
