//! Application configuration loaded from environment variables.
//!
//! All configuration comes from environment variables (or a `.env` file)
//! with defaults suitable for development.
//!
//! # Rate Limiting
//!
//! - `API_RATE_LIMIT`: Maximum admitted requests per client per window (default: 100)
//! - `API_RATE_LIMIT_PERIOD`: Window length in seconds (default: 3600)
//!
//! Both must be greater than zero; the service refuses to start otherwise.
//!
//! # Upstream LLM
//!
//! - `XAI_API_KEY`: Provider credential. The service starts without it but
//!   `/fortune` answers 500 until it is set.
//! - `XAI_API_BASE`: OpenAI-compatible base URL (default: `https://api.x.ai/v1`)
//! - `FORTUNE_MODEL`: Model used for fortunes (default: `grok-3-beta`)
//! - `UPSTREAM_TIMEOUT_SECS`: Per-call timeout (default: 30)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 64 KiB)
    pub max_request_body_size: usize,

    /// Allowed CORS origins; `*` allows any (default)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Maximum admitted requests per client key per window (default: 100)
    pub rate_limit: u32,

    /// Sliding window length (default: 3600 seconds)
    pub rate_limit_period: Duration,

    // =========================================================================
    // Upstream LLM Configuration
    // =========================================================================
    /// xAI API key (optional at startup, required to serve fortunes)
    pub xai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    pub xai_api_base: String,

    /// Model used for fortune generation
    pub fortune_model: String,

    /// Timeout for a single upstream completion call
    pub upstream_timeout: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a variable fails to parse or the
    /// resulting configuration is invalid (e.g. `API_RATE_LIMIT=0`).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8000)?,
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 64 * 1024)?,
            cors_allowed_origins: Self::parse_cors_origins(),

            // Rate limiting
            rate_limit: Self::parse_env("API_RATE_LIMIT", 100)?,
            rate_limit_period: Duration::from_secs(Self::parse_env("API_RATE_LIMIT_PERIOD", 3600)?),

            // Upstream LLM
            xai_api_key: env::var("XAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            xai_api_base: env::var("XAI_API_BASE")
                .unwrap_or_else(|_| "https://api.x.ai/v1".to_string()),
            fortune_model: env::var("FORTUNE_MODEL").unwrap_or_else(|_| "grok-3-beta".to_string()),
            upstream_timeout: Duration::from_secs(Self::parse_env("UPSTREAM_TIMEOUT_SECS", 30)?),

            // Observability
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit == 0 {
            return Err(AppError::ConfigError(
                "API_RATE_LIMIT must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_period.is_zero() {
            return Err(AppError::ConfigError(
                "API_RATE_LIMIT_PERIOD must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.upstream_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if !self.xai_api_base.starts_with("http://") && !self.xai_api_base.starts_with("https://")
        {
            return Err(AppError::ConfigError(format!(
                "XAI_API_BASE must be an http(s) URL, got {:?}",
                self.xai_api_base
            )));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if an upstream API key is configured.
    pub fn llm_configured(&self) -> bool {
        self.xai_api_key.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_request_body_size: 64 * 1024,
            cors_allowed_origins: vec!["*".to_string()],
            // Rate limiting
            rate_limit: 100,
            rate_limit_period: Duration::from_secs(3600),
            // Upstream LLM
            xai_api_key: None,
            xai_api_base: "https://api.x.ai/v1".to_string(),
            fortune_model: "grok-3-beta".to_string(),
            upstream_timeout: Duration::from_secs(30),
            // Observability
            metrics_port: 9090,
        }
    }
}
