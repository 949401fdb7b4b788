//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes and dependencies name real services)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Detect ambiguous routes and dependency cycles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, STORE_DEPENDENCY};
use crate::registry::topological_order;
use crate::routing::matcher::normalize_prefix;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service `{0}` is declared more than once")]
    DuplicateService(String),

    #[error("service name `{0}` is reserved")]
    ReservedName(String),

    #[error("service `{service}` has invalid base url `{url}`: {reason}")]
    InvalidBaseUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("{referrer} references unknown service `{service}`")]
    UnknownService { referrer: String, service: String },

    #[error("route prefix `{0}` must start with `/`")]
    InvalidPrefix(String),

    #[error("routes `{first}` and `{second}` are equally specific")]
    AmbiguousRoute { first: String, second: String },

    #[error("dependency cycle involving `{0}`")]
    DependencyCycle(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Validate a fully loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_scalars(config, &mut errors);

    let mut names = HashSet::new();
    for service in &config.services {
        if service.name == STORE_DEPENDENCY {
            errors.push(ValidationError::ReservedName(service.name.clone()));
        }
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        if let Err(reason) = check_base_url(&service.base_url) {
            errors.push(ValidationError::InvalidBaseUrl {
                service: service.name.clone(),
                url: service.base_url.clone(),
                reason,
            });
        }
        if service.max_concurrency == Some(0) {
            errors.push(ValidationError::InvalidValue {
                field: "services.max_concurrency",
                reason: format!("must be > 0 for `{}`", service.name),
            });
        }
        for dep in &service.depends_on {
            if dep != STORE_DEPENDENCY && !names_contains(config, dep) {
                errors.push(ValidationError::UnknownService {
                    referrer: format!("service `{}`", service.name),
                    service: dep.clone(),
                });
            }
        }
    }

    let graph: Vec<(&str, Vec<&str>)> = config
        .services
        .iter()
        .map(|s| {
            let deps = s
                .depends_on
                .iter()
                .map(String::as_str)
                .filter(|d| *d != STORE_DEPENDENCY)
                .collect();
            (s.name.as_str(), deps)
        })
        .collect();
    if let Err(node) = topological_order(&graph) {
        errors.push(ValidationError::DependencyCycle(node));
    }

    let mut prefixes: HashMap<String, &str> = HashMap::new();
    for route in &config.routes {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix(route.path_prefix.clone()));
            continue;
        }
        if !names_contains(config, &route.service) {
            errors.push(ValidationError::UnknownService {
                referrer: format!("route `{}`", route.path_prefix),
                service: route.service.clone(),
            });
        }
        let normalized = normalize_prefix(&route.path_prefix);
        if let Some(first) = prefixes.insert(normalized, route.path_prefix.as_str()) {
            errors.push(ValidationError::AmbiguousRoute {
                first: first.to_string(),
                second: route.path_prefix.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn names_contains(config: &GatewayConfig, name: &str) -> bool {
    config.services.iter().any(|s| s.name == name)
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() {
        return Err("query strings are not allowed".to_string());
    }
    Ok(())
}

fn validate_scalars(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let mut check = |ok: bool, field: &'static str, reason: &str| {
        if !ok {
            errors.push(ValidationError::InvalidValue {
                field,
                reason: reason.to_string(),
            });
        }
    };

    check(
        config.listener.bind_address.parse::<SocketAddr>().is_ok(),
        "listener.bind_address",
        "must be a socket address",
    );
    check(config.listener.max_connections > 0, "listener.max_connections", "must be > 0");
    check(config.timeouts.connect_ms > 0, "timeouts.connect_ms", "must be > 0");
    check(config.timeouts.request_ms > 0, "timeouts.request_ms", "must be > 0");
    check(
        config.timeouts.safety_margin_ms < config.timeouts.request_ms,
        "timeouts.safety_margin_ms",
        "must be smaller than timeouts.request_ms",
    );
    check(
        config.retries.base_delay_ms <= config.retries.max_delay_ms,
        "retries.base_delay_ms",
        "must not exceed retries.max_delay_ms",
    );
    check(
        config.circuit_breaker.failure_threshold >= 1,
        "circuit_breaker.failure_threshold",
        "must be >= 1",
    );
    check(
        config.dispatch.max_concurrency_per_backend > 0,
        "dispatch.max_concurrency_per_backend",
        "must be > 0",
    );
    check(config.startup.probe_interval_ms > 0, "startup.probe_interval_ms", "must be > 0");
    check(config.startup.probe_timeout_ms > 0, "startup.probe_timeout_ms", "must be > 0");
    check(
        config.startup.health_path.starts_with('/'),
        "startup.health_path",
        "must start with `/`",
    );
    check(config.security.max_body_size > 0, "security.max_body_size", "must be > 0");
}
