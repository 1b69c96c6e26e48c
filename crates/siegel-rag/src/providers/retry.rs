//! Per-attempt timeout with bounded exponential backoff

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Timeout and retry parameters for one kind of external call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bound on a single attempt
    pub timeout: Duration,
    /// Extra attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each failure
    pub initial_backoff: Duration,
    /// Cap on a single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy from its config section
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Total number of attempts
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay after the failed attempt number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of
    /// attempts.
    ///
    /// Timeouts and transient errors are retried. Exhausting the attempts
    /// yields `Error::ServiceUnavailable` naming `service`; any other error
    /// is returned as is on first occurrence.
    pub async fn run<F, Fut, T>(&self, service: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 0..self.attempts() {
            match timeout(self.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_transient() => last_error = e.to_string(),
                Ok(Err(e)) => return Err(e),
                Err(_) => last_error = format!("timed out after {:?}", self.timeout),
            }

            if attempt < self.max_retries {
                let delay = self.backoff(attempt);
                tracing::warn!(
                    "{} request failed (attempt {}/{}): {}; retrying in {:?}",
                    service,
                    attempt + 1,
                    self.attempts(),
                    last_error,
                    delay
                );
                sleep(delay).await;
            }
        }

        Err(Error::ServiceUnavailable {
            service: service.to_string(),
            attempts: self.attempts(),
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(150),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(1), Duration::from_millis(150));
        assert_eq!(p.backoff(30), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .run("llm", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Transient("503".into()))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("llm", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::GenerationFailed("empty".into()))
            })
            .await;
        assert!(matches!(result, Err(Error::GenerationFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_into_service_unavailable() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("llm", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        match result {
            Err(Error::ServiceUnavailable { service, attempts, message }) => {
                assert_eq!(service, "llm");
                assert_eq!(attempts, 3);
                assert!(message.contains("timed out"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
