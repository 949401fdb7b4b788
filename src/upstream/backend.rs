//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single downstream service instance
//! - Track in-flight dispatches
//! - Enforce the per-backend concurrency limit
//! - Expose the backend's health record

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::health::state::BackendHealth;
use crate::registry::ServiceDescriptor;
use crate::resilience::timeouts::{with_deadline, Deadline};

/// A downstream service the gateway dispatches to.
#[derive(Debug)]
pub struct Backend {
    pub descriptor: Arc<ServiceDescriptor>,
    pub health: Arc<BackendHealth>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    active: AtomicUsize,
}

impl Backend {
    pub fn new(descriptor: Arc<ServiceDescriptor>, health: Arc<BackendHealth>) -> Self {
        let max_concurrency = descriptor.max_concurrency.max(1);
        Self {
            descriptor,
            health,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            active: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Dispatches currently holding a permit.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Wait for a dispatch slot until `deadline`. `None` if the backend
    /// stayed saturated for the whole wait.
    pub async fn acquire(self: &Arc<Self>, deadline: Deadline) -> Option<DispatchPermit> {
        let permit = match with_deadline(deadline, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            // Elapsed, or the semaphore was closed.
            _ => return None,
        };
        self.active.fetch_add(1, Ordering::Relaxed);
        Some(DispatchPermit {
            backend: self.clone(),
            _permit: permit,
        })
    }
}

/// A RAII guard for one in-flight dispatch.
#[derive(Debug)]
pub struct DispatchPermit {
    backend: Arc<Backend>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for DispatchPermit {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        self.backend.active.fetch_sub(1, Ordering::Relaxed);
    }
}
