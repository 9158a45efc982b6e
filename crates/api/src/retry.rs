use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Capped exponential backoff around LLM calls.
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
        Self::new(config.max_retries, config.initial_backoff_ms, config.max_backoff_ms)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: usize) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    pub async fn retry<F, Fut, T, E>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut retries = 0;

        loop {
            let err = match f().await {
                Ok(value) => {
                    if retries > 0 {
                        info!(operation, attempts = retries + 1, "Recovered after retries");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if retries >= self.max_retries {
                warn!(operation, attempts = retries + 1, error = %err, "Giving up");
                return Err(err);
            }

            retries += 1;
            let delay = self.backoff_for(retries);
            warn!(
                operation,
                retry = retries,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
