use std::time::Duration;

use reqwest::{Method, StatusCode};

/// Retry policy for transient transport failures.
///
/// Connection failures are retried for every method, since the request never
/// reached the server. Dropped connections and 502/503/504 responses are
/// retried for idempotent methods only, so a `POST` or `PATCH` body is never
/// sent twice. This is independent of the single re-authentication retry
/// on 401.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryConfig {
    /// Policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Whether a response status is worth another attempt.
    pub fn is_transient(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        )
    }

    /// Whether a request can be replayed after the server may have seen it.
    pub fn is_idempotent(method: &Method) -> bool {
        matches!(
            *method,
            Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE | Method::TRACE
        )
    }

    /// Whether a transport error is worth another attempt.
    ///
    /// Timeouts and body errors are final.
    pub fn is_transient_error(error: &reqwest::Error, method: &Method) -> bool {
        if error.is_timeout() {
            return false;
        }
        error.is_connect() || (error.is_request() && Self::is_idempotent(method))
    }

    /// Delay before retry number `attempt` (zero based): doubled each time,
    /// capped at [`Self::max_delay`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
