//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → circuit_breaker.rs (admit, or fail fast while open)
//!     → timeouts.rs (every attempt bounded by the request deadline)
//!     → On failure: retries.rs (check if retryable, retry with backoff.rs)
//!     → Response body buffered up to `security.max_body_size`
//!     → circuit_breaker.rs (record the dispatch result once)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for safe requests (GET, HEAD, OPTIONS, TRACE)
//! - Circuit breaker prevents cascading failures
//! - The layer never returns an error: every result is a `DispatchOutcome`

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

use axum::body::Body;
use axum::http::{HeaderValue, Request};

use crate::config::GatewayConfig;
use crate::dispatch::{DispatchOutcome, DispatchRequest, RelayedResponse, UnavailableReason};
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::security::headers::strip_hop_by_hop;
use crate::security::limits::exceeds_length_limit;
use crate::upstream::HttpClient;

pub use circuit_breaker::{Admission, CircuitBreaker, ProbeGuard};
pub use retries::RetryPolicy;
pub use timeouts::Deadline;

use retries::is_retryable_status;
use timeouts::with_deadline;

/// Result of a single network attempt.
enum Attempt {
    Response(RelayedResponse),
    Transport(String),
    TimedOut,
    /// Response body exceeded the configured limit.
    TooLarge,
    /// Deadline had already passed; nothing was sent.
    Expired,
}

/// Timeout, retry and circuit policy around the shared HTTP client.
#[derive(Debug, Clone)]
pub struct ResilienceLayer {
    client: HttpClient,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    max_response_size: usize,
}

impl ResilienceLayer {
    pub fn new(config: &GatewayConfig, client: HttpClient) -> Self {
        Self {
            client,
            retry: RetryPolicy::new(&config.retries),
            breaker: CircuitBreaker::new(&config.circuit_breaker),
            max_response_size: config.security.max_body_size,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Send `request` to `url`, retrying per policy, until `deadline`.
    ///
    /// Does not touch circuit state; the caller records the final outcome.
    pub async fn call(
        &self,
        service: &str,
        url: &str,
        request: &DispatchRequest,
        deadline: Deadline,
    ) -> DispatchOutcome {
        let max_attempts = self.retry.max_attempts(&request.method);
        let mut attempt = 0;
        let mut previous: Option<Attempt> = None;

        loop {
            attempt += 1;
            let result = match (self.attempt(url, request, deadline).await, previous.take()) {
                // Budget ran out during the backoff: report the last real attempt.
                (Attempt::Expired, Some(earlier)) => {
                    return self.outcome(service, request, attempt - 1, earlier)
                }
                (result, _) => result,
            };

            let retryable = match &result {
                Attempt::Transport(_) => true,
                Attempt::Response(r) => is_retryable_status(r.status),
                Attempt::TimedOut | Attempt::TooLarge | Attempt::Expired => false,
            };

            if retryable && attempt < max_attempts {
                let delay = self.retry.backoff(attempt);
                if deadline.remaining() > delay {
                    tracing::info!(
                        request_id = %request.request_id,
                        service = %service,
                        attempt,
                        delay = ?delay,
                        "Retrying request"
                    );
                    metrics::record_retry(service);
                    tokio::time::sleep(delay).await;
                    previous = Some(result);
                    continue;
                }
            }

            return self.outcome(service, request, attempt, result);
        }
    }

    fn outcome(
        &self,
        service: &str,
        request: &DispatchRequest,
        attempt: u32,
        result: Attempt,
    ) -> DispatchOutcome {
        match result {
            Attempt::Response(response) => DispatchOutcome::from_response(response),
            Attempt::Transport(error) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    service = %service,
                    attempt,
                    error = %error,
                    "Upstream connection failed"
                );
                DispatchOutcome::BackendUnavailable {
                    service: service.to_string(),
                    reason: UnavailableReason::Transport(error),
                }
            }
            Attempt::TimedOut => {
                tracing::warn!(
                    request_id = %request.request_id,
                    service = %service,
                    attempt,
                    "Upstream request timed out"
                );
                DispatchOutcome::Timeout {
                    service: service.to_string(),
                }
            }
            Attempt::TooLarge => {
                tracing::warn!(
                    request_id = %request.request_id,
                    service = %service,
                    limit = self.max_response_size,
                    "Upstream response too large"
                );
                DispatchOutcome::BackendUnavailable {
                    service: service.to_string(),
                    reason: UnavailableReason::ResponseTooLarge(self.max_response_size),
                }
            }
            Attempt::Expired => {
                tracing::debug!(
                    request_id = %request.request_id,
                    service = %service,
                    "Deadline passed before the request was sent"
                );
                DispatchOutcome::Expired {
                    service: service.to_string(),
                }
            }
        }
    }

    async fn attempt(&self, url: &str, request: &DispatchRequest, deadline: Deadline) -> Attempt {
        if deadline.is_expired() {
            return Attempt::Expired;
        }

        let mut outbound = match Request::builder()
            .method(request.method.clone())
            .uri(url)
            .body(Body::from(request.body.clone()))
        {
            Ok(req) => req,
            Err(e) => return Attempt::Transport(e.to_string()),
        };
        *outbound.headers_mut() = request.headers.clone();
        if let Ok(id) = HeaderValue::from_str(&request.request_id) {
            outbound.headers_mut().insert(X_REQUEST_ID.clone(), id);
        }

        let exchange = async {
            let response = match self.client.request(outbound).await {
                Ok(response) => response,
                Err(e) => return Attempt::Transport(e.to_string()),
            };
            let (mut parts, body) = response.into_parts();
            let body = match axum::body::to_bytes(Body::new(body), self.max_response_size).await {
                Ok(body) => body,
                Err(e) if exceeds_length_limit(&e) => return Attempt::TooLarge,
                Err(e) => return Attempt::Transport(e.to_string()),
            };
            strip_hop_by_hop(&mut parts.headers);
            Attempt::Response(RelayedResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        with_deadline(deadline, exchange)
            .await
            .unwrap_or(Attempt::TimedOut)
    }
}
