//! Upstream call retry utilities.
//!
//! Provides bounded retry with exponential backoff for calls to remote
//! management APIs. Rate-limit responses are always retried within the
//! attempt cap; other failures are retried on every attempt but the last.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Backoff duration before the first retry.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the specified attempt cap.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }
}

/// Failure modes of a retried call.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The surrounding operation was cancelled during a backoff wait.
    #[error("operation cancelled")]
    Cancelled,

    /// Every attempt was consumed without a terminal error surfacing.
    #[error("max retries exceeded")]
    Exhausted,

    /// The underlying error from the final attempt.
    #[error("{0}")]
    Operation(E),
}

/// Determines whether an error signals an upstream rate-limit condition.
///
/// Matches an HTTP 429 status or an explicit rate-limit phrase anywhere in
/// the error text.
pub fn is_rate_limited(err: &impl Display) -> bool {
    let text = err.to_string();
    text.contains("429") || text.to_ascii_lowercase().contains("rate limit")
}

/// Execute an operation with bounded retry and exponential backoff.
///
/// Rate-limited errors always retry (within the attempt cap). Any other
/// error retries on all attempts except the last, where the underlying
/// error is returned unchanged. The backoff wait aborts the moment `cancel`
/// fires.
///
/// # Example
/// ```ignore
/// let devices = retry_call(&RetryPolicy::default(), &cancel, "list_devices", || {
///     directory.list()
/// })
/// .await?;
/// ```
pub async fn retry_call<F, Fut, T, E>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    f: F,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = policy.initial_backoff;

    for attempt in 1..=policy.max_attempts {
        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        operation = operation,
                        attempt = attempt,
                        "Call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if is_rate_limited(&err) {
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, waiting before retry"
                    );
                } else if attempt == policy.max_attempts {
                    return Err(RetryError::Operation(err));
                } else {
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                }

                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = sleep(backoff) => {}
                }

                backoff = (backoff * 2).min(policy.max_backoff);
            }
        }
    }

    Err(RetryError::Exhausted)
}
