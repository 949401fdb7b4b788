//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the longest matching prefix for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by specificity once; first hit is the longest prefix
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Explicit NoRouteMatched rather than silent default

use std::collections::HashMap;

use thiserror::Error;

use crate::config::{ConfigError, RouteConfig, ValidationError};
use crate::registry::ServiceRegistry;
use crate::routing::matcher::PathPrefixMatcher;

/// Client-facing routing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no route matches path `{0}`")]
    NoRouteMatched(String),

    #[error("unknown service `{0}`")]
    UnknownService(String),
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub matcher: PathPrefixMatcher,
    /// Registry name of the target service.
    pub target_service: String,
    pub strip_prefix: bool,
}

impl Route {
    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Path to send to the backend for `path`.
    pub fn forward_path(&self, path: &str) -> String {
        if self.strip_prefix {
            self.matcher.strip(path)
        } else {
            path.to_string()
        }
    }
}

/// Immutable route table.
#[derive(Debug)]
pub struct RouteTable {
    /// Sorted by descending specificity.
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes, checking them against the registry.
    ///
    /// Rejects routes naming unknown services and equally specific prefixes.
    pub fn new(configs: &[RouteConfig], registry: &ServiceRegistry) -> Result<Self, ConfigError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut routes = Vec::with_capacity(configs.len());

        for config in configs {
            if !config.path_prefix.starts_with('/') {
                return Err(ConfigError::Validation(vec![ValidationError::InvalidPrefix(
                    config.path_prefix.clone(),
                )]));
            }
            if !registry.contains(&config.service) {
                return Err(ConfigError::Validation(vec![
                    ValidationError::UnknownService {
                        referrer: format!("route `{}`", config.path_prefix),
                        service: config.service.clone(),
                    },
                ]));
            }
            let matcher = PathPrefixMatcher::new(&config.path_prefix);
            if let Some(first) = seen.insert(matcher.prefix().to_string(), &config.path_prefix) {
                return Err(ConfigError::Validation(vec![ValidationError::AmbiguousRoute {
                    first: first.to_string(),
                    second: config.path_prefix.clone(),
                }]));
            }
            routes.push(Route {
                matcher,
                target_service: config.service.clone(),
                strip_prefix: config.strip_prefix,
            });
        }

        routes.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    /// Find the route with the longest prefix matching `path`.
    pub fn match_path(&self, path: &str) -> Result<&Route, RoutingError> {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(path))
            .ok_or_else(|| RoutingError::NoRouteMatched(path.to_string()))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
