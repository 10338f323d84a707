//! Generic async retry with optional exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use tracker_core::{Error, RetryConfig};

/// Retry policy: delay for attempt *n* is `min(max_delay, base_delay * 2^n)`
/// when exponential, else `base_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: bool,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            exponential: config.use_exponential_backoff,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = if self.exponential {
            let factor = 2u64.saturating_pow(attempt.min(32));
            self.base_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms)
        } else {
            self.base_delay_ms.min(self.max_delay_ms)
        };
        Duration::from_millis(delay_ms)
    }
}

/// Runs `op` up to `max_retries + 1` times, sleeping between attempts and
/// reporting each failure through `on_retry`.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_retry: impl FnMut(&Error, u32),
) -> Result<T, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                on_retry(&e, attempt);
                let delay = policy.delay_for(attempt);
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
