//! Retry with bounded exponential backoff for outbound HTTP calls
//!
//! Retries timeouts, connection failures, 5xx, 429 and 408. Any other 4xx is
//! returned to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::config::RetrySettings;

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one, at least 1
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each retry)
    pub initial_backoff: Duration,
    /// Maximum delay between attempts
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(2000),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.initial_backoff_ms,
            settings.max_backoff_ms,
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// A policy that never retries
    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(1, 0, 0)
    }

    /// Delay before retry number `retry` (0-based): `initial * 2^retry`, capped
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let delay_ms = (self.initial_backoff.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_backoff.as_millis() as u64))
    }
}

/// Whether a status code is worth another attempt
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Whether a transport error is worth another attempt
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    error.status().is_some_and(is_retryable_status)
}

/// Run `operation` until it produces a non-retryable outcome or the policy's
/// attempts are used up.
///
/// A retryable status on the final attempt is returned as the response so the
/// caller can inspect it.
pub async fn with_retry<F, Fut>(policy: &RetryPolicy, operation: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        let last_attempt = attempt >= policy.max_attempts;

        match operation().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) || last_attempt {
                    if attempt > 1 {
                        tracing::info!("Request finished after {} attempts with {}", attempt, status);
                    }
                    return Ok(response);
                }
                tracing::warn!(
                    "Retryable status {} on attempt {} of {}",
                    status,
                    attempt,
                    policy.max_attempts
                );
            }
            Err(e) => {
                if !is_retryable_error(&e) || last_attempt {
                    tracing::debug!("Giving up after attempt {}: {}", attempt, e);
                    return Err(e);
                }
                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}",
                    attempt,
                    policy.max_attempts,
                    e
                );
            }
        }

        tokio::time::sleep(policy.delay_for_retry(attempt - 1)).await;
        attempt += 1;
    }
}
