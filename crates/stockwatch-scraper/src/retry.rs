//! Backoff policy for pickup-availability requests.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// How transient failures are retried within a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Attempts after the first; `0` runs the request once.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Ceiling for any single wait, including a server-requested one.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub(crate) const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

    pub(crate) fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: Self::DEFAULT_MAX_DELAY_MS,
        }
    }

    /// Whether `err` is worth another attempt: 429, timeouts, connect
    /// failures and 5xx.
    fn should_retry(err: &ScraperError) -> bool {
        match err {
            ScraperError::RateLimited { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            ScraperError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }

    /// Wait before retry number `attempt` (1-based), before jitter.
    ///
    /// Doubles from `base_delay_ms`; a `Retry-After` from the server raises
    /// the floor. Both are capped at `max_delay_ms`.
    fn base_delay(&self, attempt: u32, err: &ScraperError) -> u64 {
        let backoff = self
            .base_delay_ms
            .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10));
        let requested = match err {
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => retry_after_secs.saturating_mul(1000),
            _ => 0,
        };
        backoff.max(requested).min(self.max_delay_ms)
    }

    /// Apply ±25% jitter.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn jittered(delay_ms: u64) -> u64 {
        (delay_ms as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
    }

    /// Run `operation`, retrying transient failures per this policy.
    pub(crate) async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut attempt = 0u32;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !Self::should_retry(&err) || attempt >= self.max_retries {
                return Err(err);
            }

            attempt += 1;
            let delay_ms = Self::jittered(self.base_delay(attempt, &err));
            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                delay_ms,
                error = %err,
                "pickup fetch failed transiently; backing off"
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}
