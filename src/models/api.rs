use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to generate a fortune.
#[derive(Debug, Deserialize)]
pub struct FortuneRequest {
    /// Exactly three keywords to weave into the fortune
    pub keywords: Vec<String>,
}

/// Response carrying a generated fortune.
#[derive(Debug, Serialize)]
pub struct FortuneResponse {
    /// Always `"success"` on the happy path
    pub status: String,
    /// The generated fortune text
    pub fortune: String,
}

impl FortuneResponse {
    pub fn success(fortune: String) -> Self {
        Self {
            status: "success".to_string(),
            fortune,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Whether an upstream API key is configured
    pub llm_configured: bool,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Root greeting.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}
