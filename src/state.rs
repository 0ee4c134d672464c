//! Shared application state for Axum handlers.
//!
//! Holds the components every request needs:
//!
//! - **Configuration**: Runtime configuration access
//! - **Rate limiter**: The single sliding-window limiter instance
//! - **Fortune teller**: The upstream LLM client (or a test stub)
//!
//! # Lifecycle
//!
//! Built once at startup and cloned into every handler. The limiter table
//! lives as long as the last clone, i.e. the process; nothing needs tearing
//! down on shutdown.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::limiter::{RateLimitError, SlidingWindowLimiter};
use crate::llm::FortuneTeller;

/// Shared application state for Axum handlers.
///
/// Cheap to clone: every field is an `Arc` or `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Per-client admission control
    pub limiter: Arc<SlidingWindowLimiter>,
    /// Fortune generator
    pub fortune_teller: Arc<dyn FortuneTeller>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create application state, building the limiter from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] if the configured limit or period is zero.
    pub fn new(
        config: Config,
        fortune_teller: Arc<dyn FortuneTeller>,
    ) -> Result<Self, RateLimitError> {
        let limiter = SlidingWindowLimiter::new(config.rate_limit, config.rate_limit_period)?;
        Ok(Self::with_limiter(config, Arc::new(limiter), fortune_teller))
    }

    /// Create application state around an existing limiter.
    ///
    /// Lets tests inject a limiter driven by a manual clock.
    pub fn with_limiter(
        config: Config,
        limiter: Arc<SlidingWindowLimiter>,
        fortune_teller: Arc<dyn FortuneTeller>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            limiter,
            fortune_teller,
            started_at: Instant::now(),
        }
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
