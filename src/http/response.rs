//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay backend responses unchanged (status, headers, body)
//! - Map gateway-side failures to HTTP status codes with a JSON error body
//!
//! # Design Decisions
//! - Hop-by-hop headers are already stripped by the resilience layer
//! - Backend timeouts result in 504 Gateway Timeout
//! - Oversized backend responses result in 502 Bad Gateway

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::dispatch::{DispatchOutcome, RelayedResponse, UnavailableReason};
use crate::routing::RoutingError;

/// JSON error body: `{"error": <reason phrase>, "message": <detail>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A JSON error response for `status`.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            DispatchOutcome::Success(r) | DispatchOutcome::UpstreamError(r) => r.into_response(),
            DispatchOutcome::BackendUnavailable { service, reason } => {
                let message = match reason {
                    UnavailableReason::CircuitOpen => {
                        format!("Service {} is temporarily unavailable", service)
                    }
                    UnavailableReason::NotReady(state) => {
                        format!("Service {} is not ready ({})", service, state)
                    }
                    UnavailableReason::Saturated => {
                        format!("Service {} is at capacity", service)
                    }
                    UnavailableReason::Transport(e) => {
                        format!("Service unavailable: {}", e)
                    }
                    UnavailableReason::ResponseTooLarge(limit) => {
                        format!("Service {} sent a response larger than {} bytes", service, limit)
                    }
                };
                error_response(status, message)
            }
            DispatchOutcome::Timeout { service } => {
                error_response(status, format!("Service {} did not respond in time", service))
            }
            DispatchOutcome::Expired { service } => error_response(
                status,
                format!("Request deadline passed before reaching service {}", service),
            ),
            DispatchOutcome::Unroutable(RoutingError::NoRouteMatched(_)) => {
                error_response(status, "Service not found for this path")
            }
            DispatchOutcome::Unroutable(RoutingError::UnknownService(name)) => {
                error_response(status, format!("Unknown service {}", name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, HeaderValue};

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn relays_backend_response_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert("x-order-id", HeaderValue::from_static("7"));
        let outcome = DispatchOutcome::from_response(RelayedResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"{\"id\":7}"),
        });

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-order-id"], "7");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\"id\":7}");
    }

    #[tokio::test]
    async fn gateway_failures_map_to_json_errors() {
        let response = DispatchOutcome::Timeout { service: "payment".into() }.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json(response).await["error"], "Gateway Timeout");

        let response =
            DispatchOutcome::Unroutable(RoutingError::NoRouteMatched("/nope".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["message"], "Service not found for this path");

        let response = DispatchOutcome::BackendUnavailable {
            service: "order".into(),
            reason: UnavailableReason::CircuitOpen,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = DispatchOutcome::BackendUnavailable {
            service: "order".into(),
            reason: UnavailableReason::ResponseTooLarge(1024),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json(response).await["error"], "Bad Gateway");

        let response = DispatchOutcome::Expired { service: "order".into() }.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
