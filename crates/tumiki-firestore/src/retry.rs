//! Retry with exponential backoff for transient store failures.
//!
//! The delay before retry `n` is `initial_backoff * 2^n`, capped at
//! `max_backoff`, plus 0-50% random jitter. Only errors for which
//! [`StorageError::is_transient`] holds are retried.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tumiki_storage::{StorageError, StorageResult};

use crate::config::RetryConfig;

/// Runs `operation` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                let delay = compute_backoff(config, attempt);
                tracing::debug!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = config.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if attempt > 0 && err.is_transient() {
                    tracing::warn!(
                        operation = operation_name,
                        category = %err.category(),
                        error = %err,
                        "retries exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}

fn compute_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config
        .initial_backoff
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(config.max_backoff);
    let jitter_ms = (base.as_millis() as u64) / 2;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    base + Duration::from_millis(jitter)
}
