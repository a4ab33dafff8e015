//! Timeout and bounded exponential backoff around a single remote read.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::warn;

use crate::application::backend::BackendError;

const METRIC_FETCH_RETRY: &str = "portal_fetch_retry_total";
const METRIC_FETCH_FAILURE: &str = "portal_fetch_failure_total";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Window for each individual attempt.
    pub timeout: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl From<&crate::config::RetrySettings> for RetryPolicy {
    fn from(settings: &crate::config::RetrySettings) -> Self {
        Self {
            timeout: settings.timeout,
            max_attempts: settings.max_attempts.get(),
            base_delay: settings.base_delay,
            max_delay: settings.max_delay,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based):
    /// `min(base * 2^(attempt-1), max)`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs idempotent reads under [`RetryPolicy`]. Mutations never go through here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryingFetcher {
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(self.policy.timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.next_delay(attempt);
                    counter!(METRIC_FETCH_RETRY, "operation" => operation.to_string())
                        .increment(1);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable fetch failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    counter!(METRIC_FETCH_FAILURE, "operation" => operation.to_string())
                        .increment(1);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::time::Instant;

    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn next_delay_doubles_up_to_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|a| policy.next_delay(a).as_secs()).collect();
        assert_eq!(delays, [1, 2, 4, 5, 5, 5]);
    }

    #[test]
    fn next_delay_saturates_for_huge_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(200), policy.max_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_exhausts_all_attempts_with_growing_delays() {
        let fetcher = RetryingFetcher::new(policy(4));
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let result: Result<(), _> = fetcher
            .execute("news", || {
                let stamps = Arc::clone(&stamps);
                async move {
                    stamps.lock().unwrap().push(Instant::now());
                    Err(BackendError::from_status(502, "bad gateway"))
                }
            })
            .await;

        assert!(matches!(result, Err(BackendError::Server { status: 502, .. })));
        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 4);
        let gaps: Vec<u128> = stamps
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, [1000, 2000, 4000]);
        assert!(gaps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_returned_after_one_attempt() {
        let fetcher = RetryingFetcher::default();
        let calls = Arc::new(Mutex::new(0));

        let result: Result<(), _> = fetcher
            .execute("users", || {
                let calls = Arc::clone(&calls);
                async move {
                    *calls.lock().unwrap() += 1;
                    Err(BackendError::Forbidden)
                }
            })
            .await;

        assert_eq!(result, Err(BackendError::Forbidden));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_gets_a_fresh_timeout_window() {
        let fetcher = RetryingFetcher::new(RetryPolicy {
            timeout: Duration::from_secs(3),
            ..RetryPolicy::default()
        });
        let calls = Arc::new(Mutex::new(0u32));

        let result = fetcher
            .execute("events", || {
                let calls = Arc::clone(&calls);
                async move {
                    let attempt = {
                        let mut guard = calls.lock().unwrap();
                        *guard += 1;
                        *guard
                    };
                    if attempt == 1 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    } else {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_count_as_retryable_failures() {
        let fetcher = RetryingFetcher::new(RetryPolicy {
            timeout: Duration::from_millis(500),
            max_attempts: 2,
            ..RetryPolicy::default()
        });

        let result: Result<(), _> = fetcher
            .execute("documents", || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(BackendError::Timeout(Duration::from_millis(500))));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_a_later_attempt_succeeds() {
        let fetcher = RetryingFetcher::default();
        let calls = Arc::new(Mutex::new(0u32));

        let result = fetcher
            .execute("videos", || {
                let calls = Arc::clone(&calls);
                async move {
                    let mut guard = calls.lock().unwrap();
                    *guard += 1;
                    if *guard < 3 {
                        Err(BackendError::network("connection reset"))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(*calls.lock().unwrap(), 3);
    }
}
