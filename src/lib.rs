//! Service gateway library.
//!
//! Single HTTP entry point in front of a set of backend services: routes by
//! path prefix, brings backends up in dependency order, and isolates
//! failures with deadlines, retries and per-backend circuit breakers.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod registry;
pub mod routing;

// Traffic management
pub mod health;
pub mod store;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::GatewayConfig;
pub use dispatch::{DispatchOutcome, DispatchRequest, Dispatcher};
pub use http::HttpServer;
pub use lifecycle::{Shutdown, StartupCoordinator};
