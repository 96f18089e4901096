//! Bounded retries around a single upstream call.
//!
//! Each attempt is classified into an [`AttemptOutcome`]. Retryable failures
//! sleep according to the [`BackoffPolicy`] and try again until the attempt
//! budget runs out; terminal failures stop immediately.

use super::backoff::BackoffPolicy;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Errors that know whether repeating the call could succeed.
pub trait Retryable {
    /// Returns `true` for transient failures (rate limits, 5xx, timeouts).
    fn is_retryable(&self) -> bool;
}

/// Classified result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T, E> {
    /// The call produced a value.
    Success(T),
    /// The call failed but may succeed if repeated.
    RetryableFailure(E),
    /// The call failed and repeating it will not help.
    TerminalFailure(E),
}

impl<T, E> AttemptOutcome<T, E> {
    /// Classifies a raw result with the given predicate.
    pub fn classify<C>(result: Result<T, E>, is_retryable: C) -> Self
    where
        C: Fn(&E) -> bool,
    {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) if is_retryable(&err) => Self::RetryableFailure(err),
            Err(err) => Self::TerminalFailure(err),
        }
    }
}

/// Final failure of a retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure<E> {
    /// Number of attempts made, including the last one.
    pub attempts: u32,
    /// `true` when the budget ran out on a retryable error, `false` when a
    /// terminal error ended the loop.
    pub exhausted: bool,
    /// Error from the last attempt.
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exhausted {
            write!(
                f,
                "gave up after {} attempts: {}",
                self.attempts, self.last_error
            )
        } else {
            write!(f, "{}", self.last_error)
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryFailure<E> {}

/// Attempt budget plus backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 act as 1.
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    fn attempt_budget(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Runs `operation` until it succeeds, fails terminally, or the attempt
    /// budget is spent. `is_retryable` decides the class of each error.
    ///
    /// # Errors
    /// Returns a [`RetryFailure`] wrapping the last error.
    pub async fn run_with<T, E, F, Fut, C>(
        &self,
        label: &str,
        mut operation: F,
        is_retryable: C,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let budget = self.attempt_budget();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match AttemptOutcome::classify(operation().await, &is_retryable) {
                AttemptOutcome::Success(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                AttemptOutcome::TerminalFailure(err) => {
                    debug!(label, attempt, error = %err, "terminal failure, not retrying");
                    return Err(RetryFailure {
                        attempts: attempt,
                        exhausted: false,
                        last_error: err,
                    });
                }
                AttemptOutcome::RetryableFailure(err) => {
                    if attempt >= budget {
                        warn!(label, attempt, error = %err, "retries exhausted");
                        return Err(RetryFailure {
                            attempts: attempt,
                            exhausted: true,
                            last_error: err,
                        });
                    }
                    let delay = self.backoff.jittered_delay(attempt - 1);
                    warn!(
                        label,
                        attempt,
                        max_attempts = budget,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Same as [`run_with`](Self::run_with), classifying via [`Retryable`].
    ///
    /// # Errors
    /// Returns a [`RetryFailure`] wrapping the last error.
    pub async fn run<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        self.run_with(label, operation, |err: &E| err.is_retryable())
            .await
    }
}
