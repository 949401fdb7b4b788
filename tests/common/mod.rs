//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use service_gateway::config::{GatewayConfig, RouteConfig, ServiceConfig};
use service_gateway::store::{StoreError, StoreProbe};
use service_gateway::HttpServer;

/// What a mock backend last received.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

struct Inner {
    name: String,
    calls: AtomicUsize,
    health_calls: AtomicUsize,
    healthy: AtomicBool,
    status: AtomicU16,
    delay_ms: AtomicU64,
    body_size: AtomicUsize,
    last: Mutex<Option<Seen>>,
}

/// Programmable backend service on an ephemeral port.
///
/// `GET /health` answers 200 or 503 depending on `set_healthy`; every other
/// request is counted, recorded and answered with the configured status,
/// delay and body size.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    inner: Arc<Inner>,
}

impl MockBackend {
    pub async fn start(name: &str) -> Self {
        let inner = Arc::new(Inner {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
            status: AtomicU16::new(200),
            delay_ms: AtomicU64::new(0),
            body_size: AtomicUsize::new(0),
            last: Mutex::new(None),
        });

        let app = Router::new()
            .route("/health", get(health))
            .fallback(handle)
            .with_state(inner.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, inner }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.inner.calls.store(0, Ordering::SeqCst);
    }

    pub fn health_calls(&self) -> usize {
        self.inner.health_calls.load(Ordering::SeqCst)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: u16) {
        self.inner.status.store(status, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.inner.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Answer with `size` bytes of filler instead of the JSON echo; 0 restores it.
    pub fn set_body_size(&self, size: usize) {
        self.inner.body_size.store(size, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<Seen> {
        self.inner.last.lock().unwrap().clone()
    }
}

async fn health(State(inner): State<Arc<Inner>>) -> StatusCode {
    inner.health_calls.fetch_add(1, Ordering::SeqCst);
    if inner.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn handle(State(inner): State<Arc<Inner>>, request: Request<Body>) -> Response {
    inner.calls.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|p| p.to_string())
        .unwrap_or_default();
    *inner.last.lock().unwrap() = Some(Seen {
        method: parts.method,
        path_and_query: path_and_query.clone(),
        headers: parts.headers,
        body,
    });

    let delay = inner.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let status = StatusCode::from_u16(inner.status.load(Ordering::SeqCst)).unwrap();
    let size = inner.body_size.load(Ordering::SeqCst);
    if size > 0 {
        return (status, vec![b'x'; size]).into_response();
    }
    (
        status,
        [("x-backend", inner.name.clone())],
        Json(json!({ "service": inner.name, "path": path_and_query })),
    )
        .into_response()
}

/// Store probe whose reachability the test controls.
#[derive(Debug)]
pub struct TestStore {
    up: AtomicBool,
}

impl TestStore {
    pub fn new(up: bool) -> Arc<Self> {
        Arc::new(Self {
            up: AtomicBool::new(up),
        })
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreProbe for TestStore {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unreachable("test store down".into()))
        }
    }
}

/// Gateway config for the given `(name, depends_on, backend)` services and
/// `(prefix, service)` routes, with fast test timings.
pub fn gateway_config(
    services: &[(&str, &[&str], &MockBackend)],
    routes: &[(&str, &str)],
) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.services = services
        .iter()
        .map(|(name, deps, backend)| {
            let mut svc = ServiceConfig::new(name, deps);
            svc.base_url = backend.url();
            svc
        })
        .collect();
    config.routes = routes
        .iter()
        .map(|(prefix, service)| RouteConfig::new(prefix, service))
        .collect();

    config.timeouts.safety_margin_ms = 10;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config.startup.probe_interval_ms = 50;
    config.startup.probe_timeout_ms = 500;
    config
}

/// Build a gateway and run one startup round so healthy backends are Ready.
pub async fn ready_gateway(config: GatewayConfig) -> HttpServer {
    let server = HttpServer::new(config, TestStore::new(true)).unwrap();
    server.coordinator().run_round().await;
    server
}
