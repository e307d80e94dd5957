//! Backoff policy for transient HTTP failures.
//!
//! Retried: connection/timeout errors, 5xx, 408 and 429.
//! Not retried: every other 4xx.

use std::time::Duration;

use reqwest::StatusCode;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each one after.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// `base_delay * 2^retry`, capped at `max_delay`. `retry` counts from 0.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Whether a response status is worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Whether a transport error is worth another attempt.
///
/// Builder errors (bad URL and the like) will fail identically every time.
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    !error.is_builder()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 5);
        assert_eq!(p.max_attempts(), 6);
        assert_eq!(p.base_delay, Duration::from_millis(200));
    }

    #[test]
    fn delay_doubles() {
        let p = RetryPolicy::new(5, 200, 10_000);
        assert_eq!(p.delay_for_retry(0), Duration::from_millis(200));
        assert_eq!(p.delay_for_retry(1), Duration::from_millis(400));
        assert_eq!(p.delay_for_retry(2), Duration::from_millis(800));
        assert_eq!(p.delay_for_retry(3), Duration::from_millis(1600));
    }

    #[test]
    fn delay_capped() {
        let p = RetryPolicy::new(10, 200, 1000);
        assert_eq!(p.delay_for_retry(3), Duration::from_millis(1000));
        assert_eq!(p.delay_for_retry(63), Duration::from_millis(1000));
        assert_eq!(p.delay_for_retry(200), Duration::from_millis(1000));
    }

    #[test]
    fn status_classification() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));

        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::OK));
    }
}
