//! # Optimistic Retry
//!
//! One bounded retry loop shared by every read-modify-write in the operator.
//! Only errors the caller classifies as retryable (version conflicts) are
//! retried; anything else returns immediately. Each attempt must re-read the
//! object it writes, so the closure is called afresh every time.
//!
//! ```ignore
//! let applied = with_optimistic_retry("ensure", &policy, StoreError::is_conflict, || {
//!     ensure(store, &object)
//! })
//! .await?;
//! ```

use crate::observability;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounds for an optimistic-concurrency retry loop
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fractional jitter added on top of each delay (0.1 = up to +10%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::conflict_default()
    }
}

impl RetryPolicy {
    /// Five attempts, 10ms apart, 10% jitter
    pub fn conflict_default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            jitter: 0.1,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before attempt `attempt + 1`, without jitter
    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(0.0..self.jitter);
        Duration::from_secs_f64(base.as_secs_f64() * factor)
    }
}

/// Last error of a retry loop and the number of attempts it took
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up.
///
/// The error side records how many attempts ran, so callers can tell
/// exhaustion from a first-try failure.
pub async fn with_optimistic_retry<T, E, F, Fut, R>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_retryable: R,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if is_retryable(&e) && attempt < max_attempts => {
                let delay = policy.jittered_delay(attempt);
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "conflict, retrying from a fresh read"
                );
                observability::metrics::increment_conflict_retries(operation_name);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(RetryFailure {
                    attempts: attempt,
                    last_error: e,
                });
            }
        }
    }
}
