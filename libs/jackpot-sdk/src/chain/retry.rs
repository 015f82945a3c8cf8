use std::future::Future;
use std::time::Duration;

use crate::config::JackpotConfig;
use crate::errors::{ChainError, ReadError};

/// Bounded retry policy for chain reads. Writes are never retried, and
/// neither are reads that failed for a non-transient reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRetry {
    /// Total attempts, at least one
    pub attempts: u32,
    pub base_delay: Duration,
}

impl ReadRetry {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &JackpotConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }

    /// Delay before attempt `attempt + 1`: 500ms, 1000ms, 2000ms, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    pub async fn run<T, F, Fut>(&self, what: &'static str, mut op: F) -> Result<T, ReadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        what,
                        attempt,
                        max_attempts = self.attempts,
                        "Read failed, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ReadError {
                        what,
                        attempts: attempt,
                        source: e,
                    })
                }
            }
        }
    }
}

impl Default for ReadRetry {
    fn default() -> Self {
        Self::from_config(&JackpotConfig::default())
    }
}
