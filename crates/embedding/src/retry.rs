//! Retry logic with exponential backoff for embedding requests.
//!
//! Rate limiting (HTTP 429) is the common failure against hosted embedding
//! APIs, so the defaults start at one second and double on every attempt.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::EmbeddingError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Upper bound for any single delay, in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Spread delays by up to ±25% so concurrent jobs don't retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (1-indexed; 0 means the first try).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let jitter = fastrand::u64(0..jitter_range * 2);
                return Duration::from_millis(delay_ms - jitter_range + jitter);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. The closure receives the 0-indexed attempt.
pub async fn execute_with_retry<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, EmbeddingError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, EmbeddingError>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                let delay = config.calculate_delay(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "embedding request failed, backing off"
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick() -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(3)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(false)
    }

    #[test]
    fn delays_double_until_capped() {
        let cfg = RetryConfig::default()
            .with_jitter(false)
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(cfg.calculate_delay(0), Duration::ZERO);
        assert_eq!(cfg.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(cfg.calculate_delay(2), Duration::from_secs(2));
        assert_eq!(cfg.calculate_delay(3), Duration::from_secs(4));
        assert_eq!(cfg.calculate_delay(4), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let cfg = RetryConfig::default();
        for _ in 0..100 {
            let d = cfg.calculate_delay(2).as_millis();
            assert!((1500..=2500).contains(&d), "{d}");
        }
    }

    #[test]
    fn config_serde_uses_millis() {
        let json = serde_json::to_value(quick()).unwrap();
        assert_eq!(json["base_delay"], 10);
        let back: RetryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, quick());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(&quick(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(EmbeddingError::RateLimited("429".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(&quick(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EmbeddingError::Transport("timeout".into())) }
        })
        .await;

        assert_eq!(result, Err(EmbeddingError::Transport("timeout".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(&quick(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(EmbeddingError::Provider {
                    status: 401,
                    message: "invalid key".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(EmbeddingError::Provider { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
