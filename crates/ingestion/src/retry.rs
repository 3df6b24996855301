//! Bounded exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{IngestionError, Result};

/// How often and how patiently a failed provider call is repeated.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries are used up. Exhaustion becomes a transient error
    /// tagged with `scope`.
    pub async fn run<T, F, Fut>(&self, scope: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry_count = 0;
        let mut delay = self.initial_delay;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    retry_count += 1;
                    if retry_count > self.max_retries {
                        return Err(IngestionError::transient(
                            scope,
                            format!("failed after {} retries: {}", self.max_retries, e),
                        ));
                    }

                    warn!(
                        scope = scope,
                        error = %e,
                        retry = retry_count,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Provider call failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.max_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
