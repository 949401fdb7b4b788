//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build every subsystem from the validated configuration
//! - Create the Axum router with gateway endpoints and the dispatch fallback
//! - Wire up middleware (request ID, tracing, CORS, body limit, concurrency)
//! - Run the startup coordinator alongside the listener
//! - Serve until shutdown, then drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    handler::Handler,
    http::{HeaderValue, Request},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig, SecurityConfig};
use crate::dispatch::Dispatcher;
use crate::health::HealthProber;
use crate::http::request::{into_dispatch_request, GatewayRequestId, X_REQUEST_ID};
use crate::http::response::error_response;
use crate::http::status;
use crate::lifecycle::{shutdown, Shutdown, StartupCoordinator};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::resilience::ResilienceLayer;
use crate::routing::RouteTable;
use crate::store::StoreProbe;
use crate::upstream::{build_client, BackendManager};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub coordinator: Arc<StartupCoordinator>,
    pub request_timeout: Duration,
    pub max_body_size: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    dispatcher: Arc<Dispatcher>,
    coordinator: Arc<StartupCoordinator>,
}

impl HttpServer {
    /// Build the gateway from a validated configuration.
    pub fn new(config: GatewayConfig, store: Arc<dyn StoreProbe>) -> Result<Self, ConfigError> {
        let registry = ServiceRegistry::from_config(&config)?;
        let routes = RouteTable::new(&config.routes, &registry)?;
        let backends = Arc::new(BackendManager::new(&registry));

        let client = build_client(&config.timeouts);
        let resilience = ResilienceLayer::new(&config, client.clone());
        let prober = HealthProber::new(client, &config.startup);

        let coordinator = Arc::new(StartupCoordinator::new(
            &config,
            backends.clone(),
            store,
            prober,
            *resilience.breaker(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(&config, routes, backends, resilience));

        let state = AppState {
            dispatcher: dispatcher.clone(),
            coordinator: coordinator.clone(),
            request_timeout: Duration::from_millis(config.timeouts.request_ms),
            max_body_size: config.security.max_body_size,
        };

        tracing::info!(
            services = registry.len(),
            routes = dispatcher.routes().routes().len(),
            startup_order = ?registry.startup_order(),
            "Gateway configured"
        );

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            dispatcher,
            coordinator,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Only dispatched traffic counts against `listener.max_connections`, so
    /// `/health` and `/ready` answer while the gateway is saturated.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), GatewayRequestId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(cors_layer(&config.security));

        let dispatch = gateway_handler.layer(GlobalConcurrencyLimitLayer::new(
            config.listener.max_connections.max(1),
        ));

        Router::new()
            .route("/", get(status::root))
            .route("/health", get(status::health))
            .route("/ready", get(status::ready))
            .route("/api-docs", get(status::api_docs))
            .fallback(dispatch)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let coordinator = self.coordinator.clone();
        let coordinator_task = tokio::spawn(coordinator.run(shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown.subscribe()))
            .await?;

        if let Err(e) = coordinator_task.await {
            tracing::error!(error = %e, "Startup coordinator task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn coordinator(&self) -> &Arc<StartupCoordinator> {
        &self.coordinator
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins = if security.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            security
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Fallback handler: everything that is not a gateway endpoint is dispatched.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let request = match into_dispatch_request(
        request,
        Some(client),
        state.max_body_size,
        state.request_timeout,
    )
    .await
    {
        Ok(request) => request,
        Err(e) => {
            let status = e.status();
            tracing::warn!(error = %e, status = status.as_u16(), "Rejected request body");
            metrics::record_request(&method, status.as_u16(), "none", start);
            return error_response(status, e.to_string());
        }
    };

    let outcome = state.dispatcher.dispatch(&request).await;

    let service = state
        .dispatcher
        .routes()
        .match_path(&request.path)
        .map(|r| r.target_service.as_str())
        .unwrap_or("none");
    let status = outcome.status();

    tracing::debug!(
        request_id = %request.request_id,
        method = %method,
        path = %request.path,
        service = %service,
        outcome = outcome.label(),
        status = status.as_u16(),
        "Request dispatched"
    );
    metrics::record_request(&method, status.as_u16(), service, start);

    outcome.into_response()
}
