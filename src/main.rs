//! Service gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ routing ──▶ dispatcher ──▶ resilience ──▶ Backend
//!                        │                          │   (timeout/retry/        Service
//!                        │                          │    circuit breaker)
//!     /health /ready ◀───┤                          ▼
//!     /api-docs          │                    upstream backends
//!                        │                    (permits, health)
//!                        ▼                          ▲
//!                  startup coordinator ─────────────┘
//!                  (store ping, dependency-ordered probes)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;

use service_gateway::config::{load_config, loader::CONFIG_PATH_ENV};
use service_gateway::observability::{init_logging, init_metrics};
use service_gateway::store::PgStoreProbe;
use service_gateway::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let config = match load_config(path.as_deref(), |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_ms = config.timeouts.request_ms,
        "Configuration loaded"
    );

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: service_gateway::GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(PgStoreProbe::connect_lazy(&config.store)?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, store)?;
    let shutdown = Shutdown::new();
    shutdown.on_signal();

    server.run(listener, &shutdown).await?;
    Ok(())
}
