//! Bounded retry for idempotent async reads.
//!
//! Attempts are separated by a fixed delay. The caller decides which errors
//! are worth another attempt; everything else short-circuits.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the initial one included.
    pub max_attempts: u32,
    /// Fixed pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Create a policy with the specified attempt budget and the default delay.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, Self::default().delay)
    }

    /// Create a policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Error, PartialEq)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    #[error("permanent failure on attempt {attempts}: {last_error}")]
    Permanent { attempts: u32, last_error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Permanent { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last_error, .. } | RetryError::Permanent { last_error, .. } => {
                last_error
            }
        }
    }

    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } | RetryError::Permanent { last_error, .. } => {
                last_error
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Execute an async operation with bounded, fixed-delay retry.
///
/// # Arguments
/// * `policy` - Attempt budget and inter-attempt delay
/// * `operation_name` - Name of the operation for logging
/// * `is_retryable` - Returns true for errors that may succeed on another attempt
/// * `f` - The async function performing one attempt
///
/// # Example
/// ```ignore
/// let row = retry_with_policy(
///     &RetryPolicy::default(),
///     "fetch_profile",
///     ProviderError::is_transient,
///     || provider.fetch_one("user_profiles", "id", subject_id),
/// ).await?;
/// ```
pub async fn retry_with_policy<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: P,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !is_retryable(&error) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %error,
                        "Operation failed with permanent error, not retrying"
                    );
                    return Err(RetryError::Permanent {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                if attempt >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %error,
                        "Operation failed after max attempts"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    error = %error,
                    delay_ms = policy.delay.as_millis() as u64,
                    "Operation failed, retrying after delay"
                );

                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
