//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use am_core::ApiConfig;
use tracing::debug;

use crate::error::ApiError;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, base_delay: Duration::from_millis(1000) }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(attempts: u32, base_delay: Duration) -> Self {
        Self { attempts, base_delay }
    }

    /// Reads attempts and delay from the API configuration.
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }

    /// Returns the wait after failed attempt `attempt` (zero-based): `base × 2^attempt`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use am_client::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_millis(1000));
    /// assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
    /// assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    /// ```
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
///
/// Client errors (4xx) are returned immediately. The last error is returned
/// when every attempt fails.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry<F, Fut, R>(policy: RetryPolicy, mut operation: F) -> Result<R, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, ApiError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() || attempt + 1 >= attempts => return Err(err),
            Err(err) => {
                let delay = policy.delay_for(attempt);
                debug!(attempt = attempt + 1, delay_ms = delay.as_millis(), error = %err, "retrying request");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result = retry(RetryPolicy::default(), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err(ApiError::Timeout) } else { Ok(n) }
        })
        .await;

        assert_eq!(result.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000 ms + 2000 ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(RetryPolicy::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::from_response(404, b""))
        })
        .await;

        assert!(matches!(result, Err(ApiError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_error_returned_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(RetryPolicy::new(3, Duration::from_millis(10)), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::from_response(503, b""))
        })
        .await;

        assert!(matches!(result, Err(ApiError::Server { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result = retry(RetryPolicy::new(0, Duration::ZERO), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(())
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let config = ApiConfig::default();
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy, RetryPolicy::default());
    }
}
