//! Retry with exponential backoff
//!
//! Wraps the `backoff` crate behind a small policy type so API clients can
//! retry transient failures without re-deciding backoff parameters at every
//! call site.

use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::time::Duration;

/// Retry policy for an operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Upper bound on the delay between retries
    pub max_interval: Duration,
    /// Multiplier applied to the delay after each attempt
    pub multiplier: f64,
    /// Total time budget; when exceeded the last error is returned
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
            max_elapsed: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay before the first retry
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Set the upper bound on retry delay
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the total time budget
    pub fn with_max_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_elapsed = elapsed;
        self
    }
}

/// Run `operation`, retrying with exponential backoff while `is_transient`
/// classifies the error as retryable.
///
/// Permanent errors and transient errors that outlive the policy's time
/// budget are returned to the caller unchanged.
pub async fn with_retry<T, E, P, Op, Fut>(
    policy: &RetryPolicy,
    is_transient: P,
    mut operation: Op,
) -> Result<T, E>
where
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_interval(policy.max_interval)
        .with_multiplier(policy.multiplier)
        .with_max_elapsed_time(Some(policy.max_elapsed))
        .build();

    let is_transient = &is_transient;
    backoff::future::retry(backoff, || {
        let attempt = operation();
        async move {
            attempt.await.map_err(|e| {
                if is_transient(&e) {
                    tracing::debug!("transient failure, will retry: {}", e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        }
    })
    .await
}
