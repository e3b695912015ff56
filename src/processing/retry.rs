//! Fixed-delay retry policy.

use backon::{ConstantBuilder, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Final failure of a retried operation.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E: Display> {
    /// Number of attempts that were made.
    pub attempts: usize,
    /// Error returned by the last attempt.
    pub last_error: E,
}

/// Bounded retry with a constant pause between attempts and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl RetryPolicy {
    /// Build a policy making at most `max_attempts` attempts (at least one).
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Total attempts made before giving up.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Pause between two consecutive attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds, `when` rejects its error, or attempts run out.
    ///
    /// No pause follows the final attempt.
    pub async fn execute<T, E, F, Fut, W>(
        &self,
        mut operation: F,
        when: W,
    ) -> Result<T, RetryExhausted<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        W: FnMut(&E) -> bool,
    {
        let attempts = AtomicUsize::new(0);
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts - 1);

        let result = (|| {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(attempt, max_attempts = self.max_attempts, "Starting attempt");
            operation()
        })
        .retry(backoff)
        .when(when)
        .notify(|error: &E, delay: Duration| {
            tracing::warn!(
                attempt = attempts.load(Ordering::Relaxed),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed; retrying after delay"
            );
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok(value) => {
                tracing::debug!(attempts, "Operation succeeded");
                Ok(value)
            }
            Err(last_error) => Err(RetryExhausted {
                attempts,
                last_error,
            }),
        }
    }
}
