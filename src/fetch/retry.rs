//! Retry policy and sleep abstraction
//!
//! Backoff timing is computed by `RetryPolicy` and every delay in the fetch
//! loop goes through a `Sleeper`, so tests can observe the schedule without
//! waiting for it.

use crate::config::{duration_from_secs, RetryConfig};
use async_trait::async_trait;
use std::time::Duration;

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    ///
    /// `min(base * 2^(attempt-1), max)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let seconds = self.base_backoff.as_secs_f64() * 2f64.powi(exponent);
        self.max_backoff.min(duration_from_secs(seconds))
    }

    /// Returns true if another attempt may follow the given one
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            duration_from_secs(config.base_backoff_seconds),
            duration_from_secs(config.max_backoff_seconds),
        )
    }
}

/// Source of delays for the fetch loop
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
