//! Sliding-window-log admission control.
//!
//! # Algorithm
//!
//! Each key owns an ascending log of admission timestamps. On every check,
//! under one lock:
//!
//! 1. Read `now` from the [`Clock`].
//! 2. Sweep the whole table, dropping keys whose *newest* timestamp is at
//!    least one window old.
//! 3. Fetch (or create) the log for the key.
//! 4. If the log holds `limit` or more timestamps:
//!    - oldest still inside the window: reject;
//!    - oldest aged out: evict exactly that one timestamp and fall through.
//! 5. Append `now` and admit.
//!
//! Eviction in step 4 is lazy and one-at-a-time. Under sustained load a key
//! regains a single slot per aged-out timestamp per check, which determines
//! the exact `Remaining` and `Reset` values reported to clients.
//!
//! ```text
//! limit = 2, window = 10s, key "X"
//!
//!   t=0   [0]        admit   remaining=1 reset=10
//!   t=1   [0,1]      admit   remaining=0 reset=11
//!   t=2   [0,1]      reject  retry_after=8 reset=10
//!   t=11  sweep drops "X" (11-1 >= 10), admit remaining=1
//! ```
//!
//! # Concurrency
//!
//! The table sits behind a single `std::sync::Mutex`. The critical section is
//! pure in-memory work and is never held across an `.await`.
//!
//! # Admission Accounting
//!
//! A timestamp is recorded at admission time and never rolled back, so a
//! request whose handler fails still consumes its slot.

mod clock;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::metrics;

/// Error type for limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// The request limit cannot be zero.
    ZeroLimit,
    /// The window length cannot be zero.
    ZeroWindow,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroLimit => write!(f, "rate limit must be greater than 0"),
            RateLimitError::ZeroWindow => write!(f, "rate limit period must be greater than 0"),
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Values reported for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Configured limit (`X-RateLimit-Limit`).
    pub limit: u32,
    /// Slots left after this request (`X-RateLimit-Remaining`).
    pub remaining: u32,
    /// `now + window` as whole Unix seconds (`X-RateLimit-Reset`).
    pub reset: u64,
}

/// Values reported for a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    /// Configured limit (`X-RateLimit-Limit`).
    pub limit: u32,
    /// Whole seconds until the oldest logged request leaves the window.
    pub retry_after: u64,
    /// `oldest + window` as whole Unix seconds (`X-RateLimit-Reset`).
    pub reset: u64,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted(Admission),
    Rejected(Rejection),
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted(_))
    }
}

type RateLimitTable = HashMap<String, VecDeque<f64>>;

/// Per-key sliding-window-log rate limiter.
///
/// Constructed once at startup and shared behind an `Arc` for the process
/// lifetime. State is never persisted.
pub struct SlidingWindowLimiter {
    table: Mutex<RateLimitTable>,
    limit: u32,
    window_secs: f64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("limit", &self.limit)
            .field("window_secs", &self.window_secs)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

impl SlidingWindowLimiter {
    /// Create a limiter reading time from the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] if `limit` or `window` is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, RateLimitError> {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    /// Create a limiter with an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] if `limit` or `window` is zero.
    pub fn with_clock(
        limit: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }

        Ok(Self {
            table: Mutex::new(HashMap::new()),
            limit,
            window_secs: window.as_secs_f64(),
            clock,
        })
    }

    /// Configured maximum admissions per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Configured window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_secs)
    }

    /// Number of keys currently holding a log.
    pub fn tracked_keys(&self) -> usize {
        self.lock_table().len()
    }

    /// Run the admission algorithm for `key`, recording the request if it is
    /// admitted.
    pub fn check(&self, key: &str) -> Decision {
        let mut table = self.lock_table();
        let now = self.clock.now();
        let window = self.window_secs;

        // O(active keys) per request; fine at the cardinality this service sees.
        table.retain(|_, log| log.back().is_some_and(|&newest| now - newest < window));

        let log = table.entry(key.to_owned()).or_default();

        if log.len() >= self.limit as usize
            && let Some(&oldest) = log.front()
        {
            let age = now - oldest;
            if age < window {
                let decision = Decision::Rejected(Rejection {
                    limit: self.limit,
                    retry_after: whole_secs(window - age).max(1),
                    reset: whole_secs(oldest + window),
                });
                metrics::record_tracked_keys(table.len());
                return decision;
            }

            log.pop_front();
            debug!(key = %key, "Evicted aged-out timestamp from full window");
        }

        log.push_back(now);
        let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
        let decision = Decision::Admitted(Admission {
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
            reset: whole_secs(now + window),
        });
        metrics::record_tracked_keys(table.len());
        decision
    }

    /// Lock the table, recovering from poisoning.
    ///
    /// Every mutation leaves the map structurally valid, so a panic in another
    /// holder cannot leave it half-updated.
    fn lock_table(&self) -> MutexGuard<'_, RateLimitTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Round a non-negative number of seconds down to an integer.
#[inline]
fn whole_secs(secs: f64) -> u64 {
    if secs <= 0.0 { 0 } else { secs.floor() as u64 }
}
