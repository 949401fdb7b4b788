//! Upstream connectivity subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → target service identified
//!     → pool.rs (look up the service's backend)
//!     → backend.rs (acquire a dispatch permit, bounded per backend)
//!     → HttpClient (pooled keep-alive connection to the service)
//!     → Permit released on drop
//! ```
//!
//! # Design Decisions
//! - One backend per service; the gateway does not balance across replicas
//! - Permit waits share the request deadline
//! - A single pooled client is shared by dispatch and health probes

pub mod backend;
pub mod pool;

use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;

pub use backend::{Backend, DispatchPermit};
pub use pool::BackendManager;

/// Pooled HTTP client used for every outbound call.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the shared client with connect and idle timeouts applied.
pub fn build_client(timeouts: &TimeoutConfig) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_millis(timeouts.connect_ms)));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
        .build(connector)
}
