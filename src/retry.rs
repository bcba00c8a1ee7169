//! Retry policy and backoff state
//!
//! Rate-limited attempts wait `base_delay * 2^attempt`; transient failures
//! (timeouts, dropped connections) wait half of that. Delays are capped at
//! `max_delay`, and a server `Retry-After` hint raises the wait but never
//! past the cap. `max_retries` counts every attempt, the first included, so
//! the default of 3 means one attempt and two retries; once it is spent the
//! caller gets a fatal error.
//!
//! The state is an explicit value so a walker can hold it across awaits
//! and tests can step through it without sleeping.

use crate::error::{Error, Result};
use crate::http::FetchResult;
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff configuration shared by fetches and sink batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry of a rate-limited attempt
    #[serde(with = "millis")]
    pub base_delay: Duration,
    /// Upper bound for any single delay
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Attempts allowed in total, including the first
    pub max_retries: u32,
    pub backoff: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
            max_retries: 3,
            backoff: BackoffType::Exponential,
        }
    }
}

/// Why an attempt is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// 403/429 style throttling; full delay
    RateLimited,
    /// Timeout or dropped connection; half delay
    Transient,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32, delay: Duration },
    GiveUp { attempts: u32 },
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_retries,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32, kind: RetryKind) -> Duration {
        let base = match kind {
            RetryKind::RateLimited => self.base_delay,
            RetryKind::Transient => self.base_delay / 2,
        };
        let delay = match self.backoff {
            BackoffType::Constant => base,
            BackoffType::Linear => base.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => base.saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max_delay)
    }
}

/// Retry bookkeeping for one logical operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries consumed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record a failed attempt and decide whether to try again
    pub fn next(
        &mut self,
        policy: &RetryPolicy,
        kind: RetryKind,
        hint: Option<Duration>,
    ) -> RetryDecision {
        let attempts = self.attempt + 1;
        if attempts >= policy.max_retries {
            return RetryDecision::GiveUp { attempts };
        }
        let computed = policy.delay_for(self.attempt, kind);
        let delay = hint.map_or(computed, |h| computed.max(h).min(policy.max_delay));
        self.attempt += 1;
        RetryDecision::Retry {
            attempt: self.attempt,
            delay,
        }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Run `op` until it succeeds, fails fatally, or runs out of retries.
///
/// Returns the successful body or an error: `Fatal` for a fatal outcome,
/// `MaxRetriesExceeded` once the policy gives up.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let mut state = RetryState::new();
    loop {
        let (kind, hint, cause) = match op().await {
            FetchResult::Success { body, .. } => return Ok(body),
            FetchResult::FatalFailure { cause } => return Err(Error::Fatal { cause }),
            FetchResult::RateLimited { retry_after } => {
                (RetryKind::RateLimited, retry_after, "rate limited".to_string())
            }
            FetchResult::TransientFailure { cause } => (RetryKind::Transient, None, cause),
        };

        match state.next(policy, kind, hint) {
            RetryDecision::Retry { attempt, delay } => {
                warn!(
                    "{label}: {cause}, attempt {}/{} in {:?}",
                    attempt + 1,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::GiveUp { attempts } => {
                return Err(Error::MaxRetriesExceeded {
                    attempts,
                    last_cause: cause,
                });
            }
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(base_ms: u64, retries: u32) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(base_ms), retries)
    }

    #[test]
    fn test_exponential_delays_double() {
        let p = policy(10_000, 3);
        assert_eq!(p.delay_for(0, RetryKind::RateLimited), Duration::from_secs(10));
        assert_eq!(p.delay_for(1, RetryKind::RateLimited), Duration::from_secs(20));
        assert_eq!(p.delay_for(2, RetryKind::RateLimited), Duration::from_secs(40));
    }

    #[test]
    fn test_transient_delay_is_half() {
        let p = policy(10_000, 3);
        assert_eq!(p.delay_for(0, RetryKind::Transient), Duration::from_secs(5));
        assert_eq!(p.delay_for(2, RetryKind::Transient), Duration::from_secs(20));
    }

    #[test]
    fn test_delay_is_capped() {
        let p = policy(10_000, 20).with_max_delay(Duration::from_secs(60));
        assert_eq!(p.delay_for(10, RetryKind::RateLimited), Duration::from_secs(60));
    }

    #[test]
    fn test_constant_and_linear_backoff() {
        let mut p = policy(100, 3);
        p.backoff = BackoffType::Constant;
        assert_eq!(p.delay_for(2, RetryKind::RateLimited), Duration::from_millis(100));
        p.backoff = BackoffType::Linear;
        assert_eq!(p.delay_for(2, RetryKind::RateLimited), Duration::from_millis(300));
    }

    #[test]
    fn test_state_gives_up_after_max_attempts() {
        let p = policy(10, 3);
        let mut state = RetryState::new();
        assert!(matches!(
            state.next(&p, RetryKind::RateLimited, None),
            RetryDecision::Retry { attempt: 1, .. }
        ));
        assert!(matches!(
            state.next(&p, RetryKind::RateLimited, None),
            RetryDecision::Retry { attempt: 2, .. }
        ));
        assert_eq!(
            state.next(&p, RetryKind::RateLimited, None),
            RetryDecision::GiveUp { attempts: 3 }
        );
    }

    #[test]
    fn test_retry_after_hint_raises_delay_within_cap() {
        let p = policy(10, 3).with_max_delay(Duration::from_secs(5));
        let mut state = RetryState::new();
        assert_eq!(
            state.next(&p, RetryKind::RateLimited, Some(Duration::from_secs(2))),
            RetryDecision::Retry {
                attempt: 1,
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(
            state.next(&p, RetryKind::RateLimited, Some(Duration::from_secs(600))),
            RetryDecision::Retry {
                attempt: 2,
                delay: Duration::from_secs(5)
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_with_retry_recovers_after_rate_limit() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fetch_with_retry(&policy(1, 3), "page", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                FetchResult::RateLimited { retry_after: None }
            } else {
                FetchResult::Success {
                    status: 200,
                    body: "ok",
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_stops_on_fatal() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = fetch_with_retry(&policy(1, 3), "page", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            FetchResult::fatal("HTTP 401: unauthorized")
        })
        .await;

        assert!(matches!(result, Err(Error::Fatal { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_exhausts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = fetch_with_retry(&policy(1, 3), "page", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            FetchResult::transient("timed out")
        })
        .await;

        match result {
            Err(Error::MaxRetriesExceeded {
                attempts,
                last_cause,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_cause, "timed out");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_single_attempt_policies() {
        for p in [RetryPolicy::none(), policy(10, 0)] {
            assert_eq!(
                RetryState::new().next(&p, RetryKind::Transient, None),
                RetryDecision::GiveUp { attempts: 1 }
            );
        }
    }

    #[test]
    fn test_policy_yaml_uses_millis() {
        let p: RetryPolicy = serde_yaml::from_str("base_delay: 250\nmax_retries: 5").unwrap();
        assert_eq!(p.base_delay, Duration::from_millis(250));
        assert_eq!(p.max_retries, 5);
        assert_eq!(p.max_delay, Duration::from_secs(300));
    }
}
