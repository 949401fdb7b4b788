//! Startup coordination and readiness.
//!
//! # Responsibilities
//! - Probe the store and each backend on a fixed interval
//! - Bring backends up in dependency order
//! - Run half-open probes for backends whose circuit cooled down
//! - Answer whether the gateway as a whole is ready
//!
//! # Design Decisions
//! - A backend is probed only once every dependency is serving
//! - Readiness is sticky per backend: having been Ready once is enough;
//!   later outages are handled by the circuit breaker, not by readiness
//! - Rounds visit backends in topological order so one round can bring up
//!   a whole healthy chain

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::{GatewayConfig, STORE_DEPENDENCY};
use crate::health::active::HealthProber;
use crate::health::state::HealthState;
use crate::observability::metrics;
use crate::registry::ServiceDescriptor;
use crate::resilience::{Admission, CircuitBreaker};
use crate::store::StoreProbe;
use crate::upstream::BackendManager;

/// Drives backends from Unknown to Ready and tracks gateway readiness.
pub struct StartupCoordinator {
    backends: Arc<BackendManager>,
    store: Arc<dyn StoreProbe>,
    prober: HealthProber,
    breaker: CircuitBreaker,
    interval: Duration,
    store_ready: AtomicBool,
}

impl StartupCoordinator {
    pub fn new(
        config: &GatewayConfig,
        backends: Arc<BackendManager>,
        store: Arc<dyn StoreProbe>,
        prober: HealthProber,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            backends,
            store,
            prober,
            breaker,
            interval: Duration::from_millis(config.startup.probe_interval_ms.max(1)),
            store_ready: AtomicBool::new(false),
        }
    }

    /// Store reachable on the latest probe and every backend Ready at least once.
    pub fn is_ready(&self) -> bool {
        self.store_reachable() && self.backends.iter().all(|b| b.health.has_been_ready())
    }

    pub fn store_reachable(&self) -> bool {
        self.store_ready.load(Ordering::Acquire)
    }

    /// What readiness is still waiting for, dependencies first.
    pub fn pending(&self) -> Vec<String> {
        let mut pending = Vec::new();
        if !self.store_reachable() {
            pending.push(STORE_DEPENDENCY.to_string());
        }
        pending.extend(
            self.backends
                .iter()
                .filter(|b| !b.health.has_been_ready())
                .map(|b| b.name().to_string()),
        );
        pending
    }

    pub fn backends(&self) -> &Arc<BackendManager> {
        &self.backends
    }

    /// Run one probe round.
    pub async fn run_round(&self) {
        let store_ok = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store probe failed");
                false
            }
        };
        if self.store_ready.swap(store_ok, Ordering::AcqRel) != store_ok {
            tracing::info!(reachable = store_ok, "Store reachability changed");
        }

        for backend in self.backends.iter() {
            let health = &backend.health;
            match health.state() {
                HealthState::Unknown | HealthState::Starting if !health.has_been_ready() => {
                    health.transition(HealthState::Unknown, HealthState::Starting);

                    if !self.dependencies_serving(&backend.descriptor, store_ok) {
                        tracing::debug!(service = %backend.name(), "Waiting for dependencies");
                        continue;
                    }

                    if self.prober.probe(&backend.descriptor).await {
                        health.reset_failures();
                        health.transition(HealthState::Starting, HealthState::Ready);
                    }
                }
                HealthState::Unreachable => {
                    if let Admission::Probe(guard) = self.breaker.admit(health) {
                        if self.prober.probe(&backend.descriptor).await {
                            guard.succeed();
                        } else {
                            guard.fail();
                        }
                    }
                }
                _ => {}
            }

            metrics::record_backend_health(backend.name(), health.state().is_serving());
        }
    }

    fn dependencies_serving(&self, service: &ServiceDescriptor, store_ok: bool) -> bool {
        service.depends_on.iter().all(|dep| {
            if dep == STORE_DEPENDENCY {
                store_ok
            } else {
                self.backends
                    .get(dep)
                    .map(|b| b.health.state().is_serving())
                    .unwrap_or(false)
            }
        })
    }

    /// Probe every interval until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            backends = self.backends.count(),
            "Startup coordinator starting"
        );

        let mut ticker = time::interval(self.interval);
        let mut announced = false;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_round().await;
                    let ready = self.is_ready();
                    if ready && !announced {
                        tracing::info!("Gateway ready");
                    }
                    announced = ready;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Startup coordinator received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for StartupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupCoordinator")
            .field("backends", &self.backends.count())
            .field("interval", &self.interval)
            .field("store_ready", &self.store_reachable())
            .finish()
    }
}
