use anyhow::{Result, anyhow};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Retry a future with exponential backoff. Each attempt is bounded by
    /// `per_attempt`; an elapsed timeout counts as a failed attempt.
    /// `on_retry` runs before every repeated attempt.
    pub async fn retry<F, Fut, T>(
        &self,
        operation_name: &str,
        per_attempt: Duration,
        mut on_retry: impl FnMut(),
        mut f: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let outcome = match timeout(per_attempt, f()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("timed out after {:?}", per_attempt)),
            };

            match outcome {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %format!("{e:#}"),
                            "Operation failed after max retries"
                        );
                        return Err(e.context(format!(
                            "{} failed after {} attempts",
                            operation_name, attempt
                        )));
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;
                    on_retry();

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, 1, 4);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let mut retries = 0;

        let result = policy
            .retry("flaky", Duration::from_secs(1), || retries += 1, || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("connection reset")
                }
                Ok(42)
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2, 1, 1);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let err = policy
            .retry("broken", Duration::from_secs(1), || {}, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("503"))
            })
            .await
            .unwrap_err();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(format!("{err:#}").contains("broken failed after 3 attempts"));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let policy = RetryPolicy::new(0, 1, 1);
        let err = policy
            .retry("slow", Duration::from_millis(5), || {}, || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
    }
}
