//! Request pacing
//!
//! Uses the governor crate to keep a steady interval between requests to
//! the same service, independent of any backoff applied after a rate limit.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for request pacing
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Minimum interval between two requests
    pub interval: Duration,
    /// Requests allowed back to back before pacing kicks in
    pub burst_size: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        // One request every 100ms
        Self {
            interval: Duration::from_millis(100),
            burst_size: 1,
        }
    }
}

impl PacerConfig {
    /// Create a pacer config from a request rate
    pub fn per_second(requests_per_second: f64) -> Self {
        let rate = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            requests_per_second
        } else {
            1.0
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / rate),
            burst_size: 1,
        }
    }

    #[must_use]
    pub fn with_burst(mut self, burst_size: u32) -> Self {
        self.burst_size = burst_size;
        self
    }
}

/// Token bucket pacer shared by clones
#[derive(Clone)]
pub struct Pacer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl Pacer {
    /// Create a new pacer with the given config
    pub fn new(config: &PacerConfig) -> Self {
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(config.interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until the next request may be sent
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to take a permit without waiting
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer").finish()
    }
}
