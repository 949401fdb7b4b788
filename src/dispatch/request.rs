//! The unit of work handed to the dispatcher.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::resilience::timeouts::Deadline;

/// A fully buffered inbound request plus its deadline.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Inbound path, before any prefix stripping.
    pub path: String,
    pub query: Option<String>,
    /// Headers to forward (already sanitized).
    pub headers: HeaderMap,
    pub body: Bytes,
    pub deadline: Deadline,
    pub request_id: String,
}

impl DispatchRequest {
    /// An empty-bodied request with `budget` to complete.
    pub fn new(method: Method, path: impl Into<String>, budget: Duration) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            deadline: Deadline::after(budget),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}
