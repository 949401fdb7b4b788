//! Backend pool management.
//!
//! # Responsibilities
//! - Hold one backend per registered service
//! - Look backends up by service name
//! - Iterate backends in startup order for the coordinator and status pages

use std::collections::HashMap;
use std::sync::Arc;

use crate::health::state::BackendHealth;
use crate::registry::ServiceRegistry;
use crate::upstream::backend::Backend;

/// Manages the gateway's backends.
#[derive(Debug)]
pub struct BackendManager {
    backends: HashMap<String, Arc<Backend>>,
    /// Dependencies before dependents.
    order: Vec<String>,
}

impl BackendManager {
    /// Create one backend per registry entry, each with a fresh health record.
    pub fn new(registry: &ServiceRegistry) -> Self {
        let backends = registry
            .iter()
            .map(|descriptor| {
                let health = Arc::new(BackendHealth::new(descriptor.name.clone()));
                (
                    descriptor.name.clone(),
                    Arc::new(Backend::new(descriptor.clone(), health)),
                )
            })
            .collect();

        Self {
            backends,
            order: registry.startup_order().to_vec(),
        }
    }

    pub fn get(&self, service: &str) -> Option<&Arc<Backend>> {
        self.backends.get(service)
    }

    /// All backends, dependencies first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Backend>> {
        self.order.iter().filter_map(|name| self.backends.get(name))
    }

    /// Number of backends, one per registered service.
    pub fn count(&self) -> usize {
        self.backends.len()
    }
}
