//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Turn an inbound request into a buffered dispatch request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An ID supplied by the client is kept, so callers can correlate
//! - Bodies are buffered once so retries can resend them
//! - The request deadline starts once the body is buffered, so a slow upload
//!   does not eat the backend's budget

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, HeaderName, HeaderValue, Request, StatusCode};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::dispatch::DispatchRequest;
use crate::resilience::timeouts::Deadline;
use crate::security::headers::forward_headers;
use crate::security::limits::exceeds_length_limit;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates request IDs for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayRequestId;

impl MakeRequestId for GatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request's ID, or `"unknown"` if the request-id layer did not run.
pub fn request_id(parts: &Parts) -> String {
    parts
        .headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Failure to buffer an inbound body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(axum::Error),
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            BodyError::Read(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Buffer `request` into a [`DispatchRequest`] with `budget` to complete,
/// counted from when the body has been read.
pub async fn into_dispatch_request(
    request: Request<Body>,
    client: Option<SocketAddr>,
    max_body_size: usize,
    budget: Duration,
) -> Result<DispatchRequest, BodyError> {
    let (parts, body) = request.into_parts();
    let body: Bytes = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| {
            if exceeds_length_limit(&e) {
                BodyError::TooLarge {
                    limit: max_body_size,
                }
            } else {
                BodyError::Read(e)
            }
        })?;
    let deadline = Deadline::after(budget);
    let request_id = request_id(&parts);
    let headers = forward_headers(&parts.headers, client, &request_id);

    Ok(DispatchRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        body,
        deadline,
        request_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_uuids() {
        let req = Request::new(());
        let id = GatewayRequestId.make_request_id(&req).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[tokio::test]
    async fn converts_inbound_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/orders/7?expand=items")
            .header("x-request-id", "abc")
            .header("host", "gw")
            .body(Body::from("{\"qty\":1}"))
            .unwrap();

        let dispatch = into_dispatch_request(
            request,
            Some("127.0.0.1:9999".parse().unwrap()),
            1024,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(dispatch.path, "/api/orders/7");
        assert_eq!(dispatch.query.as_deref(), Some("expand=items"));
        assert_eq!(dispatch.request_id, "abc");
        assert_eq!(&dispatch.body[..], b"{\"qty\":1}");
        assert!(dispatch.headers.get("host").is_none());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let request = Request::builder()
            .uri("/api/users")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();
        let err = into_dispatch_request(request, None, 16, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 16 }));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn oversized_chunked_body_is_payload_too_large() {
        let chunks = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 12])),
            Ok(Bytes::from(vec![0u8; 12])),
        ]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/orders")
            .body(Body::from_stream(chunks))
            .unwrap();
        let err = into_dispatch_request(request, None, 16, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn broken_body_is_bad_request() {
        let chunks = futures_util::stream::iter(vec![Err::<Bytes, _>(std::io::Error::other("reset"))]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/orders")
            .body(Body::from_stream(chunks))
            .unwrap();
        let err = into_dispatch_request(request, None, 16, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::Read(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_starts_after_body_is_read() {
        let slow_upload = futures_util::stream::once(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, std::io::Error>(Bytes::from_static(b"{}"))
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/orders")
            .body(Body::from_stream(slow_upload))
            .unwrap();
        let dispatch = into_dispatch_request(request, None, 1024, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(&dispatch.body[..], b"{}");
        assert_eq!(dispatch.deadline.remaining(), Duration::from_millis(200));
    }
}
