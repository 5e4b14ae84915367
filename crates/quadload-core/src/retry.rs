//! Retry with exponential backoff for batch-level store failures

use std::time::Duration;

use crate::error::StoreError;

/// Retry budget for whole-batch store errors.
///
/// Only errors the store reports as transient are retried. Per-document
/// failures are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Fire-and-forget: a failed batch is logged and dropped
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Delay before zero-based retry `retry`: `base * 2^retry` (2s, 4s, 8s, ... for base 2s)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Retry a store call while it fails with a retryable error.
///
/// `attempt_fn` receives the zero-based attempt number. Returns the first
/// success, or the last error once the budget is spent or the error is
/// permanent.
pub fn retry_with_backoff<T>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt_fn: impl FnMut(u32) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                let delay = policy.backoff_duration(attempt);
                attempt += 1;
                log::warn!(
                    "{label}: attempt {attempt}/{} failed: {e}, retrying in {delay:?}",
                    policy.max_retries
                );
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}
