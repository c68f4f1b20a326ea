//! Fixed-interval retry for bulk calls
//!
//! A failed call is repeated up to `max_retries` more times with the same
//! delay between attempts. Waiting is cancellable and cancellation is never
//! retried.

use crate::config::{BulkConfig, RetryOn};
use crate::domain::{Result, SyncError};
use crate::log_retry_attempt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry settings for one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub max_retries: u32,
    /// Delay between attempts
    pub interval: Duration,
    /// Which failures are repeated
    pub retry_on: RetryOn,
}

impl RetryPolicy {
    /// A policy that gives up on the first failure
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            interval: Duration::ZERO,
            retry_on: RetryOn::AnyError,
        }
    }

    pub fn from_config(config: &BulkConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            interval: config.retry_interval(),
            retry_on: config.retry_on,
        }
    }

    /// Total attempts a failing call gets
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether `err` may be retried under this policy
    pub fn should_retry(&self, err: &SyncError) -> bool {
        match self.retry_on {
            RetryOn::AnyError => err.is_retryable(),
            RetryOn::TransportOnly => err.is_transport(),
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or runs
    /// out of attempts. The last error is returned.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        label: &str,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= self.max_attempts() || !self.should_retry(&err) || cancel.is_cancelled() {
                return Err(err);
            }

            log_retry_attempt!(attempt, self.max_attempts(), label, &err);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Canceled),
                _ = tokio::time::sleep(self.interval) => {}
            }

            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&BulkConfig::default())
    }
}
