//! Gateway-owned endpoints: info, health, readiness and the service catalogue.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::http::server::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Service Platform API Gateway",
        "version": VERSION,
        "documentation": "/api-docs",
        "healthcheck": "/health",
        "readiness": "/ready",
    }))
}

/// `GET /health`: liveness plus the gateway's view of each backend.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let coordinator = &state.coordinator;
    let services: Map<String, Value> = coordinator
        .backends()
        .iter()
        .map(|b| (b.name().to_string(), json!(b.health.state())))
        .collect();

    let store = if coordinator.store_reachable() {
        "reachable"
    } else {
        "unreachable"
    };

    Json(json!({
        "status": "healthy",
        "service": "api-gateway",
        "store": store,
        "services": services,
    }))
}

/// `GET /ready`: 200 once ready, 503 with what is still pending otherwise.
pub async fn ready(State(state): State<AppState>) -> Response {
    let coordinator = &state.coordinator;
    if coordinator.is_ready() {
        (StatusCode::OK, Json(json!({ "ready": true }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false, "pending": coordinator.pending() })),
        )
            .into_response()
    }
}

/// `GET /api-docs`: routes and the services behind them.
pub async fn api_docs(State(state): State<AppState>) -> Json<Value> {
    let backends = state.dispatcher.backends();
    let routes: Vec<Value> = state
        .dispatcher
        .routes()
        .routes()
        .iter()
        .map(|route| {
            let depends_on = backends
                .get(&route.target_service)
                .map(|b| b.descriptor.depends_on.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            json!({
                "path_prefix": route.path_prefix(),
                "service": route.target_service,
                "strip_prefix": route.strip_prefix,
                "depends_on": depends_on,
            })
        })
        .collect();

    Json(json!({
        "title": "Service Platform API Gateway",
        "version": VERSION,
        "routes": routes,
    }))
}
