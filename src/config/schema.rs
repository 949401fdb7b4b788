//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from an optional TOML
//! file; service base addresses and store credentials are filled in from the
//! environment by the loader.

use serde::{Deserialize, Serialize};

/// Reserved dependency name standing for the shared relational store.
pub const STORE_DEPENDENCY: &str = "store";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, in-flight limit).
    pub listener: ListenerConfig,

    /// Downstream services addressed by the gateway.
    pub services: Vec<ServiceConfig>,

    /// Route definitions mapping path prefixes to services.
    pub routes: Vec<RouteConfig>,

    /// Shared relational store connection parameters.
    pub store: StoreConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Per-backend dispatch limits.
    pub dispatch: DispatchConfig,

    /// Startup coordination and probing.
    pub startup: StartupConfig,

    /// Request limits and CORS.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            services: default_services(),
            routes: default_routes(),
            store: StoreConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            dispatch: DispatchConfig::default(),
            startup: StartupConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Maximum requests in flight across the whole gateway (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// A downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique logical service name (e.g., "child-assistance").
    pub name: String,

    /// Base URL. Normally left empty and supplied by `<NAME>_SERVICE_URL`.
    #[serde(default)]
    pub base_url: String,

    /// Services (or `store`) that must be ready before this one is probed.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Overrides `dispatch.max_concurrency_per_backend` for this service.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl ServiceConfig {
    pub fn new(name: &str, depends_on: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            base_url: String::new(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            max_concurrency: None,
        }
    }

    /// Environment variable carrying this service's base URL.
    pub fn url_env_key(&self) -> String {
        format!("{}_SERVICE_URL", self.name.to_uppercase().replace('-', "_"))
    }
}

/// Route configuration mapping a path prefix to a service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match (segment aligned).
    pub path_prefix: String,

    /// Logical name of the target service.
    pub service: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,
}

impl RouteConfig {
    pub fn new(path_prefix: &str, service: &str) -> Self {
        Self {
            path_prefix: path_prefix.to_string(),
            service: service.to_string(),
            strip_prefix: false,
        }
    }
}

/// The platform topology: user first, then the order tier, then the
/// booking/payment tier.
fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig::new("user", &[STORE_DEPENDENCY]),
        ServiceConfig::new("order", &["user"]),
        ServiceConfig::new("notification", &["user"]),
        ServiceConfig::new("provider", &["user"]),
        ServiceConfig::new("payment", &["user", "order"]),
        ServiceConfig::new("repair", &["user", "order"]),
        ServiceConfig::new("child-assistance", &["user", "order"]),
        ServiceConfig::new("moving", &["user", "order"]),
        ServiceConfig::new("cleaning", &["user", "order"]),
    ]
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/api/users", "user"),
        RouteConfig::new("/api/orders", "order"),
        RouteConfig::new("/api/payments", "payment"),
        RouteConfig::new("/api/notifications", "notification"),
        RouteConfig::new("/api/providers", "provider"),
        RouteConfig::new("/api/repairs", "repair"),
        RouteConfig::new("/api/child-assistance", "child-assistance"),
        RouteConfig::new("/api/moving", "moving"),
        RouteConfig::new("/api/cleaning", "cleaning"),
    ]
}

/// Store connection parameters.
///
/// Either `url` or all of host/port/user/password/database must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,

    /// Pool size.
    pub max_connections: u32,

    /// Upper bound on waiting for a pooled connection, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            max_connections: 2,
            acquire_timeout_ms: 2_000,
        }
    }
}

/// Timeout configuration for dispatches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Total budget for one inbound request in milliseconds.
    pub request_ms: u64,

    /// Subtracted from the inbound deadline to get the downstream one.
    pub safety_margin_ms: u64,

    /// Idle pooled connection lifetime in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            request_ms: 30_000,
            safety_margin_ms: 50,
            idle_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries for safe methods.
    pub enabled: bool,

    /// Additional attempts after the first one.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            base_delay_ms: 50,
            max_delay_ms: 500,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed dispatches before the backend is unreachable.
    pub failure_threshold: u32,

    /// Time an unreachable backend is skipped before a probe, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_ms: 30_000,
        }
    }
}

/// Dispatch limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Concurrent dispatches allowed per backend.
    pub max_concurrency_per_backend: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency_per_backend: 128,
        }
    }
}

/// Startup coordination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Delay between probe rounds in milliseconds.
    pub probe_interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub probe_timeout_ms: u64,

    /// Path probed on each backend.
    pub health_path: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 2_000,
            probe_timeout_ms: 2_000,
            health_path: "/health".to_string(),
        }
    }
}

/// Request limits and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request or response body size in bytes.
    pub max_body_size: usize,

    /// Allowed CORS origins; `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_uses_upper_snake_case() {
        let svc = ServiceConfig::new("child-assistance", &[]);
        assert_eq!(svc.url_env_key(), "CHILD_ASSISTANCE_SERVICE_URL");
    }

    #[test]
    fn default_topology_has_nine_routed_services() {
        let config = GatewayConfig::default();
        assert_eq!(config.services.len(), 9);
        assert_eq!(config.routes.len(), 9);
        for route in &config.routes {
            assert!(config.services.iter().any(|s| s.name == route.service));
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [retries]
            max_retries = 1

            [circuit_breaker]
            failure_threshold = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.retries.max_retries, 1);
        assert_eq!(config.retries.base_delay_ms, 50);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.services.len(), 9);
    }
}
