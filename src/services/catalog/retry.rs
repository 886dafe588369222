//! Rate-limit retry for catalog calls.
//!
//! Each attempt either succeeds, fails for good, or reports a rate-limit
//! signal. Rate-limit signals are retried with exponential backoff until the
//! retry budget is spent.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Outcome of a single remote attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// The server asked us to slow down, optionally saying for how long (seconds)
    RateLimited { retry_after: Option<u64> },
}

/// Backoff settings for rate-limited calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    ///
    /// A server hint wins when present; otherwise `base * 2^retry`. Both are
    /// capped at `max_delay`.
    pub fn delay_for(&self, retry: u32, retry_after: Option<u64>) -> Duration {
        if let Some(secs) = retry_after {
            return Duration::from_secs(secs).min(self.max_delay);
        }
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it finishes, fails, or the retry budget is exhausted.
    ///
    /// `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AppResult<Attempt<T>>>,
    {
        let mut attempt = 0;
        loop {
            let retry_after = match op(attempt).await? {
                Attempt::Done(value) => return Ok(value),
                Attempt::RateLimited { retry_after } => retry_after,
            };

            if attempt >= self.max_retries {
                // Callers always get a hint, computed if the server gave none
                let retry_after = retry_after
                    .unwrap_or_else(|| whole_secs(self.delay_for(attempt + 1, None)));
                tracing::error!(
                    call = label,
                    attempts = attempt + 1,
                    retry_after,
                    "Rate limit retry budget exhausted"
                );
                return Err(AppError::RateLimited {
                    retry_after: Some(retry_after),
                });
            }

            let delay = self.delay_for(attempt, retry_after);
            tracing::warn!(
                call = label,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Rate limited by catalog API, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Rounds up so a sub-second delay never becomes a zero hint
fn whole_secs(delay: Duration) -> u64 {
    let secs = delay.as_secs();
    if delay.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
