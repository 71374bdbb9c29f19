//! Retry logic for transient failures with exponential backoff.
//!
//! Provides configurable retry strategies with:
//! - Exponential backoff with optional jitter
//! - A bounded number of attempts
//! - Per-error retry classification via [`Retryable`]
//!
//! When attempts run out the caller gets the *last real error*, not a synthetic
//! "exhausted" marker, so the root cause can still be shown to the user.

use std::future::Future;
use std::time::{Duration, Instant};

/// Retry strategy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    #[must_use]
    pub fn no_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Config for tests and quick local retries (short delays, no jitter).
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    /// Calculates the delay after a failed attempt (`attempt` is zero-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.add_jitter {
            // Add up to 25% jitter
            let jitter = rand::random::<f64>() * 0.25 * capped_delay;
            capped_delay + jitter
        } else {
            capped_delay
        };

        // Negative or non-finite delays (bad multiplier) fall back to the cap
        Duration::try_from_secs_f64(final_delay).unwrap_or(self.max_delay)
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result: the first success, or the last error encountered
    pub result: Result<T, E>,
    /// Number of attempts made
    pub attempts: u32,
    /// Total time spent, including waits
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Returns true if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Drops the bookkeeping and returns the plain result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Determines if an error is retryable.
pub trait Retryable {
    /// Returns true if the error should be retried.
    fn is_retryable(&self) -> bool;
}

/// Executes an async operation with retry logic.
///
/// The operation runs at least once even if `max_attempts` is 0, so the
/// returned error is always one the operation actually produced.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let start = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
            Err(e) if attempts < max_attempts && e.is_retryable() => {
                let delay = config.delay_for_attempt(attempts - 1);

                log::warn!(
                    "Attempt {}/{} failed (retrying in {:?}): {}",
                    attempts,
                    max_attempts,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    log::warn!("Attempt {}/{} failed, giving up: {}", attempts, max_attempts, e);
                } else {
                    log::warn!("Attempt {} failed with a non-retryable error: {}", attempts, e);
                }
                return RetryResult {
                    result: Err(e),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct TestError(bool, u32); // (is_retryable, attempt number)

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError(retryable={}, attempt={})", self.0, self.1)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let config = RetryConfig::quick();
        let result = retry(&config, || async { Ok::<_, TestError>(42) }).await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result(), Ok(42));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let config = RetryConfig::quick();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(TestError(true, attempt))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let config = RetryConfig::quick().max_attempts(4);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&config, || {
            let counter = counter_clone.clone();
            async move { Err::<i32, _>(TestError(true, counter.fetch_add(1, Ordering::SeqCst))) }
        })
        .await;

        assert_eq!(result.attempts, 4);
        assert_eq!(result.into_result(), Err(TestError(true, 3)));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let config = RetryConfig::quick();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError(false, 0))
            }
        })
        .await;

        assert!(!result.is_ok());
        assert_eq!(result.attempts, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig::quick().max_attempts(0);
        let result = retry(&config, || async { Err::<i32, _>(TestError(true, 0)) }).await;

        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result(), Err(TestError(true, 0)));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_secs(1))
            .backoff_multiplier(2.0)
            .max_delay(Duration::from_secs(10))
            .no_jitter();

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(10)); // capped
    }

    #[test]
    fn test_negative_multiplier_does_not_panic() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_secs(1))
            .backoff_multiplier(-2.0)
            .max_delay(Duration::from_secs(8))
            .no_jitter();

        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(8));

        let nan = config.clone().backoff_multiplier(f64::NAN);
        assert_eq!(nan.delay_for_attempt(1), Duration::from_secs(8));
    }
}
