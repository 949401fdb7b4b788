//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayConfig.services (validated)
//!     → descriptor.rs (ServiceDescriptor per service)
//!     → ServiceRegistry (name → descriptor, startup order)
//!     → read by the route table, dispatcher and startup coordinator
//! ```
//!
//! # Design Decisions
//! - Built once at startup, never mutated
//! - Lookup is by name; nothing holds a mutable pointer into the registry
//! - Dependency order is computed here so a cycle fails startup

pub mod descriptor;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, GatewayConfig, ValidationError, STORE_DEPENDENCY};

pub use descriptor::ServiceDescriptor;

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown service `{0}`")]
    UnknownService(String),
}

/// Name → descriptor mapping, read-only after construction.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<ServiceDescriptor>>,
    /// Topological order: dependencies before dependents.
    startup_order: Vec<String>,
}

impl ServiceRegistry {
    /// Build the registry from a validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let mut services = HashMap::new();

        for svc in &config.services {
            let base_url = Url::parse(&svc.base_url).map_err(|e| {
                ConfigError::Validation(vec![ValidationError::InvalidBaseUrl {
                    service: svc.name.clone(),
                    url: svc.base_url.clone(),
                    reason: e.to_string(),
                }])
            })?;
            let descriptor = ServiceDescriptor {
                name: svc.name.clone(),
                base_url,
                depends_on: svc.depends_on.iter().cloned().collect::<BTreeSet<_>>(),
                max_concurrency: svc
                    .max_concurrency
                    .unwrap_or(config.dispatch.max_concurrency_per_backend),
            };
            if services
                .insert(svc.name.clone(), Arc::new(descriptor))
                .is_some()
            {
                return Err(ConfigError::Validation(vec![
                    ValidationError::DuplicateService(svc.name.clone()),
                ]));
            }
        }

        for svc in services.values() {
            for dep in &svc.depends_on {
                if dep != STORE_DEPENDENCY && !services.contains_key(dep) {
                    return Err(ConfigError::Validation(vec![
                        ValidationError::UnknownService {
                            referrer: format!("service `{}`", svc.name),
                            service: dep.clone(),
                        },
                    ]));
                }
            }
        }

        let graph: Vec<(&str, Vec<&str>)> = config
            .services
            .iter()
            .map(|s| {
                (
                    s.name.as_str(),
                    s.depends_on.iter().map(String::as_str).collect(),
                )
            })
            .collect();
        let startup_order = topological_order(&graph)
            .map_err(|node| ConfigError::Validation(vec![ValidationError::DependencyCycle(node)]))?
            .into_iter()
            .map(str::to_string)
            .collect();

        tracing::debug!(services = services.len(), "Service registry built");

        Ok(Self {
            services,
            startup_order,
        })
    }

    /// Resolve a service by name.
    pub fn resolve(&self, name: &str) -> Result<&Arc<ServiceDescriptor>, RegistryError> {
        self.services
            .get(name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Service names with every dependency listed before its dependents.
    pub fn startup_order(&self) -> &[String] {
        &self.startup_order
    }

    /// Descriptors in startup order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceDescriptor>> {
        self.startup_order
            .iter()
            .filter_map(move |name| self.services.get(name))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Order `nodes` so that every node comes after the nodes it depends on.
///
/// Dependencies that are not themselves nodes (such as `store`) are ignored.
/// Ties keep declaration order. Returns the name of a node on a cycle if one
/// exists.
pub fn topological_order<'a>(nodes: &[(&'a str, Vec<&'a str>)]) -> Result<Vec<&'a str>, String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (*name, i))
        .collect();
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    fn visit<'a>(
        i: usize,
        nodes: &[(&'a str, Vec<&'a str>)],
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
        order: &mut Vec<&'a str>,
    ) -> Result<(), String> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::InProgress => return Err(nodes[i].0.to_string()),
            Mark::Unvisited => {}
        }
        marks[i] = Mark::InProgress;
        for dep in &nodes[i].1 {
            if let Some(&j) = index.get(dep) {
                visit(j, nodes, index, marks, order)?;
            }
        }
        marks[i] = Mark::Done;
        order.push(nodes[i].0);
        Ok(())
    }

    for i in 0..nodes.len() {
        visit(i, nodes, &index, &mut marks, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        for (i, svc) in config.services.iter_mut().enumerate() {
            svc.base_url = format!("http://127.0.0.1:{}", 9000 + i);
        }
        config
    }

    #[test]
    fn resolves_known_services() {
        let registry = ServiceRegistry::from_config(&config()).unwrap();
        assert_eq!(registry.len(), 9);
        let order = registry.resolve("order").unwrap();
        assert!(order.depends_on.contains("user"));
        assert_eq!(order.max_concurrency, 128);
    }

    #[test]
    fn unknown_service_is_an_error() {
        let registry = ServiceRegistry::from_config(&config()).unwrap();
        assert_eq!(
            registry.resolve("billing").unwrap_err(),
            RegistryError::UnknownService("billing".into())
        );
    }

    #[test]
    fn startup_order_respects_dependencies() {
        let registry = ServiceRegistry::from_config(&config()).unwrap();
        let order = registry.startup_order();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert_eq!(pos("user"), 0);
        assert!(pos("order") < pos("payment"));
        assert!(pos("order") < pos("cleaning"));
        assert!(pos("user") < pos("notification"));
    }

    #[test]
    fn detects_cycles() {
        let nodes = vec![("a", vec!["b"]), ("b", vec!["c"]), ("c", vec!["a"])];
        assert!(topological_order(&nodes).is_err());
    }

    #[test]
    fn ignores_external_dependencies() {
        let nodes = vec![("b", vec!["a", "store"]), ("a", vec!["store"])];
        assert_eq!(topological_order(&nodes).unwrap(), vec!["a", "b"]);
    }
}
