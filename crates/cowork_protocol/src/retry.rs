use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TransportError;

/// Maximum reconnect attempts after an initial failed open.
pub const MAX_RETRIES: u32 = 5;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 500;
/// Ceiling for any single backoff delay.
pub const MAX_DELAY_MS: u64 = 15_000;

static PERMANENT_FAILURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)http error: 4\d\d|unauthori[sz]ed|forbidden|unsupported url scheme")
        .expect("permanent failure regex must compile")
});

/// Returns true when reopening the channel could plausibly succeed.
pub fn is_retryable_transport_error(error: &TransportError) -> bool {
    match error {
        TransportError::InvalidUrl { .. } => false,
        TransportError::Connect(message) => !PERMANENT_FAILURE_RE.is_match(message),
        TransportError::Timeout(_)
        | TransportError::Send(_)
        | TransportError::Receive(_)
        | TransportError::Closed { .. } => true,
    }
}

/// Delay before retry `attempt` under the default policy.
pub fn retry_delay(attempt: u32) -> Duration {
    BackoffPolicy::default().delay_for(attempt)
}

/// Caller-supplied reconnect policy. The connection manager never retries on
/// its own; callers wrap `connect` with this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl BackoffPolicy {
    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (0-based), doubling and capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30);
        let factor = 2u32.saturating_pow(exponent);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
