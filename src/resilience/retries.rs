//! Retry policy.
//!
//! # Responsibilities
//! - Decide whether a request may be retried (safe methods only)
//! - Decide whether a result is worth retrying
//! - Space attempts with jittered exponential backoff
//!
//! # Design Decisions
//! - Only GET/HEAD/OPTIONS/TRACE are retried; anything that can change state
//!   is sent at most once
//! - Connection errors and 502/503/504 are retryable; other statuses are the
//!   backend's answer and are relayed
//! - Timeouts are not retried: the deadline is already spent

use std::time::Duration;

use axum::http::{Method, StatusCode};

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;

/// Retry policy derived from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: if config.enabled { config.max_retries } else { 0 },
            backoff: Backoff::from_config(config),
        }
    }

    /// Total attempts allowed for `method`.
    pub fn max_attempts(&self, method: &Method) -> u32 {
        if is_retryable_method(method) {
            1 + self.max_retries
        } else {
            1
        }
    }

    /// Delay before retry number `retry`.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}

/// Read-only methods, the only ones retried automatically.
pub fn is_retryable_method(method: &Method) -> bool {
    method.is_safe()
}

/// Statuses that indicate the backend could not serve the request at all.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}
