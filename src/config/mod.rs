//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML) + environment (<SERVICE>_SERVICE_URL, PG*)
//!     → loader.rs (parse, overlay environment)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → passed by reference into the registry and route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new deployment means a new process
//! - All tuning fields have defaults to allow minimal configs
//! - Missing service addresses or store settings are fatal
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, DispatchConfig, GatewayConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RetryConfig, RouteConfig, SecurityConfig, ServiceConfig, StartupConfig,
    StoreConfig, TimeoutConfig, STORE_DEPENDENCY,
};
pub use validation::ValidationError;
