//! Dispatch outcomes.
//!
//! Every dispatch ends in exactly one of these; none of them is an `Err`.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::health::state::HealthState;
use crate::routing::RoutingError;

/// A backend response as it will be relayed to the client.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Why a backend was not (successfully) called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Circuit open and still cooling down, or a probe is already in flight.
    CircuitOpen,
    /// Backend has not completed startup.
    NotReady(HealthState),
    /// No concurrency slot freed up before the deadline.
    Saturated,
    /// Connection-level failure on the final attempt.
    Transport(String),
    /// Response body exceeded the configured limit; carries the limit in bytes.
    ResponseTooLarge(usize),
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::CircuitOpen => f.write_str("circuit open"),
            UnavailableReason::NotReady(state) => write!(f, "backend {}", state),
            UnavailableReason::Saturated => f.write_str("backend saturated"),
            UnavailableReason::Transport(e) => write!(f, "connection failed: {}", e),
            UnavailableReason::ResponseTooLarge(limit) => {
                write!(f, "response exceeds {} bytes", limit)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Backend answered with status < 400.
    Success(RelayedResponse),
    /// Backend answered with status >= 400. Relayed as-is.
    UpstreamError(RelayedResponse),
    BackendUnavailable {
        service: String,
        reason: UnavailableReason,
    },
    /// Deadline expired before the backend answered.
    Timeout { service: String },
    /// Deadline ran out inside the gateway before anything was sent.
    Expired { service: String },
    Unroutable(RoutingError),
}

impl DispatchOutcome {
    /// Classify a backend response by status.
    pub fn from_response(response: RelayedResponse) -> Self {
        if response.status.as_u16() < 400 {
            DispatchOutcome::Success(response)
        } else {
            DispatchOutcome::UpstreamError(response)
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Success(_) => "success",
            DispatchOutcome::UpstreamError(_) => "upstream_error",
            DispatchOutcome::BackendUnavailable { .. } => "backend_unavailable",
            DispatchOutcome::Timeout { .. } => "timeout",
            DispatchOutcome::Expired { .. } => "deadline_exceeded",
            DispatchOutcome::Unroutable(_) => "unroutable",
        }
    }

    /// Whether this outcome counts against the backend's circuit.
    ///
    /// Short-circuit rejections and expiry inside the gateway never reached
    /// the backend and do not count.
    pub fn is_backend_failure(&self) -> bool {
        match self {
            DispatchOutcome::Timeout { .. } => true,
            DispatchOutcome::BackendUnavailable {
                reason: UnavailableReason::Transport(_),
                ..
            } => true,
            DispatchOutcome::UpstreamError(r) => {
                crate::resilience::retries::is_retryable_status(r.status)
            }
            _ => false,
        }
    }

    /// Whether a request was actually sent to the backend.
    pub fn reached_backend(&self) -> bool {
        match self {
            DispatchOutcome::Success(_)
            | DispatchOutcome::UpstreamError(_)
            | DispatchOutcome::Timeout { .. } => true,
            DispatchOutcome::BackendUnavailable { reason, .. } => matches!(
                reason,
                UnavailableReason::Transport(_) | UnavailableReason::ResponseTooLarge(_)
            ),
            DispatchOutcome::Expired { .. } | DispatchOutcome::Unroutable(_) => false,
        }
    }

    /// Status the client will see.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchOutcome::Success(r) | DispatchOutcome::UpstreamError(r) => r.status,
            DispatchOutcome::BackendUnavailable {
                reason: UnavailableReason::ResponseTooLarge(_),
                ..
            } => StatusCode::BAD_GATEWAY,
            DispatchOutcome::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DispatchOutcome::Timeout { .. } | DispatchOutcome::Expired { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            DispatchOutcome::Unroutable(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> RelayedResponse {
        RelayedResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn classifies_by_status() {
        assert!(matches!(DispatchOutcome::from_response(response(201)), DispatchOutcome::Success(_)));
        assert!(matches!(DispatchOutcome::from_response(response(302)), DispatchOutcome::Success(_)));
        assert!(matches!(
            DispatchOutcome::from_response(response(404)),
            DispatchOutcome::UpstreamError(_)
        ));
    }

    #[test]
    fn only_backend_faults_count_against_circuit() {
        assert!(!DispatchOutcome::from_response(response(404)).is_backend_failure());
        assert!(!DispatchOutcome::from_response(response(500)).is_backend_failure());
        assert!(DispatchOutcome::from_response(response(503)).is_backend_failure());
        assert!(DispatchOutcome::Timeout { service: "order".into() }.is_backend_failure());
        assert!(!DispatchOutcome::BackendUnavailable {
            service: "order".into(),
            reason: UnavailableReason::CircuitOpen,
        }
        .is_backend_failure());
        assert!(!DispatchOutcome::Expired { service: "order".into() }.is_backend_failure());
        assert!(!DispatchOutcome::BackendUnavailable {
            service: "order".into(),
            reason: UnavailableReason::ResponseTooLarge(1024),
        }
        .is_backend_failure());
    }

    #[test]
    fn expiry_inside_gateway_never_reached_backend() {
        let expired = DispatchOutcome::Expired { service: "order".into() };
        assert!(!expired.reached_backend());
        assert_eq!(expired.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(DispatchOutcome::Timeout { service: "order".into() }.reached_backend());
    }

    #[test]
    fn oversized_response_is_bad_gateway() {
        let outcome = DispatchOutcome::BackendUnavailable {
            service: "order".into(),
            reason: UnavailableReason::ResponseTooLarge(1024),
        };
        assert!(outcome.reached_backend());
        assert_eq!(outcome.status(), StatusCode::BAD_GATEWAY);
    }
}
