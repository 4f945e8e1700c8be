use shared::{Failure, FetchResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Attempt ceiling plus linear backoff for reads.
///
/// The wait before attempt `n` (n >= 2) is `(n - 1) * base_delay`. Unauthorized
/// and permanent failures are never retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// A ceiling of zero is treated as one attempt.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Exactly one attempt.
    pub fn never() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(max_attempts, self.base_delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Whether to try again after `attempt` (1-based) failed with `failure`.
    pub fn should_retry(&self, attempt: u32, failure: &Failure) -> bool {
        !failure.is_unauthorized() && !failure.permanent && attempt < self.max_attempts
    }

    /// Wait after `failed_attempt` before the next one.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        self.base_delay.saturating_mul(failed_attempt)
    }

    /// Runs `operation` until it succeeds or the policy gives up; the last
    /// failure is returned as-is.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> FetchResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(failure) if self.should_retry(attempt, &failure) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, failure, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
