//! Core fixed-window rate limiter implementation.

use std::time::Duration;
use tracing::{debug, info, trace};

use super::identity::ClientKey;
use super::store::CounterStore;
use crate::error::{Result, TurnstileError};

/// Default number of requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 10;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Prefix applied to client keys in the counter store.
pub const RATE_LIMIT_KEY_PREFIX: &str = "RateLimit_";

/// Limits applied to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    max_requests_per_window: u64,
    window: Duration,
}

impl LimiterConfig {
    /// Create a limiter configuration; both values must be non-zero.
    pub fn new(max_requests_per_window: u64, window: Duration) -> Result<Self> {
        if max_requests_per_window == 0 {
            return Err(TurnstileError::Config(
                "max requests per window must be positive".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(TurnstileError::Config(
                "rate limit window must be positive".to_string(),
            ));
        }

        Ok(Self {
            max_requests_per_window,
            window,
        })
    }

    pub fn max_requests_per_window(&self) -> u64 {
        self.max_requests_per_window
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Outcome of an atomic admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed; `count` includes it.
    Admitted { count: u64 },
    /// The client is at or above its limit for the current window.
    Rejected,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Per-client fixed-window rate limiter.
///
/// A client may make exactly `max_requests_per_window` admitted requests per
/// window. Every recorded request pushes the key's expiry out to a full
/// window from now, so a client that keeps calling stays limited until it
/// goes quiet for one whole window.
///
/// Callers either use [`try_admit`](Self::try_admit), which checks and counts
/// in one step, or the relaxed pair [`is_limited`](Self::is_limited) then
/// [`record_request`](Self::record_request). The pair can let concurrent
/// requests from one client overshoot the limit.
pub struct FixedWindowLimiter<S> {
    store: S,
    config: LimiterConfig,
}

impl<S: CounterStore> FixedWindowLimiter<S> {
    /// Create a limiter over `store`.
    pub fn new(store: S, config: LimiterConfig) -> Self {
        Self { store, config }
    }

    /// Whether `key` has used up its requests for the current window.
    ///
    /// Read-only: calling this never changes the stored count.
    pub fn is_limited(&self, key: &ClientKey) -> Result<bool> {
        let count = self.current_count(key)?;
        let limited = count >= self.config.max_requests_per_window;

        trace!(
            key = %key,
            count = count,
            limited = limited,
            "Checked rate limit"
        );

        Ok(limited)
    }

    /// Count one request for `key` and restart its window.
    pub fn record_request(&self, key: &ClientKey) -> Result<()> {
        let count = self.store.increment(&store_key(key), self.config.window)?;

        debug!(key = %key, count = count, "Recorded request");
        Ok(())
    }

    /// Check and count a request for `key` as a single step.
    ///
    /// Under concurrent calls for the same key exactly
    /// `max_requests_per_window` are admitted per window, provided the store
    /// implements `increment_if_below` atomically.
    pub fn try_admit(&self, key: &ClientKey) -> Result<Admission> {
        let admission = match self.store.increment_if_below(
            &store_key(key),
            self.config.max_requests_per_window,
            self.config.window,
        )? {
            Some(count) => {
                debug!(key = %key, count = count, "Request admitted");
                Admission::Admitted { count }
            }
            None => {
                info!(
                    key = %key,
                    limit = self.config.max_requests_per_window,
                    "Rate limit exceeded"
                );
                Admission::Rejected
            }
        };

        Ok(admission)
    }

    /// Requests counted for `key` in the current window (0 if none).
    pub fn current_count(&self, key: &ClientKey) -> Result<u64> {
        Ok(self.store.get(&store_key(key))?.unwrap_or(0))
    }

    /// Get the limiter configuration.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Get the underlying counter store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn store_key(key: &ClientKey) -> String {
    format!("{}{}", RATE_LIMIT_KEY_PREFIX, key)
}
