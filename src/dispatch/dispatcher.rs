//! Request dispatch.
//!
//! # Responsibilities
//! - Resolve the route for a request path
//! - Short-circuit calls to backends that cannot serve
//! - Bound per-backend concurrency within the request deadline
//! - Hand off to the resilience layer and account the result once
//!
//! # Design Decisions
//! - `dispatch` never fails; every path ends in a `DispatchOutcome`
//! - Health is checked before waiting for a permit, admission after, so a
//!   probe slot is never held while queueing
//! - Short-circuit rejections are not backend failures, and neither is a
//!   deadline that runs out before the request is sent

use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::dispatch::{DispatchOutcome, DispatchRequest, UnavailableReason};
use crate::health::state::{BackendHealth, HealthState};
use crate::observability::metrics;
use crate::resilience::{Admission, ResilienceLayer};
use crate::routing::{RouteTable, RoutingError};
use crate::upstream::BackendManager;

/// Routes requests to backends through the resilience layer.
#[derive(Debug)]
pub struct Dispatcher {
    routes: RouteTable,
    backends: Arc<BackendManager>,
    resilience: ResilienceLayer,
    safety_margin: Duration,
}

impl Dispatcher {
    pub fn new(
        config: &GatewayConfig,
        routes: RouteTable,
        backends: Arc<BackendManager>,
        resilience: ResilienceLayer,
    ) -> Self {
        Self {
            routes,
            backends,
            resilience,
            safety_margin: Duration::from_millis(config.timeouts.safety_margin_ms),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn backends(&self) -> &Arc<BackendManager> {
        &self.backends
    }

    pub fn resilience(&self) -> &ResilienceLayer {
        &self.resilience
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        let route = match self.routes.match_path(&request.path) {
            Ok(route) => route,
            Err(e) => {
                tracing::debug!(request_id = %request.request_id, path = %request.path, "No route matched");
                return DispatchOutcome::Unroutable(e);
            }
        };
        let service = route.target_service.as_str();

        let backend = match self.backends.get(service) {
            Some(backend) => backend,
            None => {
                return DispatchOutcome::Unroutable(RoutingError::UnknownService(service.to_string()))
            }
        };

        let breaker = self.resilience.breaker();
        if let Some(state) = breaker.would_reject(&backend.health) {
            let outcome = unavailable(service, &backend.health, state);
            metrics::record_dispatch(service, outcome.label());
            return outcome;
        }

        let deadline = request.deadline.shortened_by(self.safety_margin);
        if deadline.is_expired() {
            return expired(service, request);
        }

        let permit = match backend.acquire(deadline).await {
            Some(permit) => permit,
            None => {
                tracing::warn!(
                    request_id = %request.request_id,
                    service = %service,
                    in_flight = backend.active(),
                    "Backend saturated"
                );
                metrics::record_dispatch(service, "backend_unavailable");
                return DispatchOutcome::BackendUnavailable {
                    service: service.to_string(),
                    reason: UnavailableReason::Saturated,
                };
            }
        };
        if deadline.is_expired() {
            return expired(service, request);
        }

        let probe = match breaker.admit(&permit.health) {
            Admission::Allowed => None,
            Admission::Probe(guard) => Some(guard),
            Admission::Rejected(state) => {
                let outcome = unavailable(service, &permit.health, state);
                metrics::record_dispatch(service, outcome.label());
                return outcome;
            }
        };

        let url = permit
            .descriptor
            .url_for(&route.forward_path(&request.path), request.query.as_deref());

        tracing::debug!(
            request_id = %request.request_id,
            service = %service,
            backend = %permit.descriptor.authority(),
            url = %url,
            "Dispatching request"
        );

        let outcome = self.resilience.call(service, &url, request, deadline).await;
        let failed = outcome.is_backend_failure();

        if !outcome.reached_backend() {
            // No verdict: an unresolved probe reopens the circuit on drop.
            drop(probe);
        } else {
            match probe {
                Some(guard) if failed => guard.fail(),
                Some(guard) => guard.succeed(),
                None if failed => {
                    breaker.record_failure(&permit.health);
                }
                None => breaker.record_success(&permit.health),
            }
        }

        metrics::record_dispatch(service, outcome.label());
        outcome
    }
}

fn expired(service: &str, request: &DispatchRequest) -> DispatchOutcome {
    tracing::debug!(
        request_id = %request.request_id,
        service = %service,
        "Request budget spent before dispatch"
    );
    metrics::record_dispatch(service, "deadline_exceeded");
    DispatchOutcome::Expired {
        service: service.to_string(),
    }
}

/// Short-circuit outcome. A `Starting` backend that has served before is
/// running its half-open probe, which reads as an open circuit.
fn unavailable(service: &str, health: &BackendHealth, state: HealthState) -> DispatchOutcome {
    let reason = match state {
        HealthState::Unreachable => UnavailableReason::CircuitOpen,
        HealthState::Starting if health.has_been_ready() => UnavailableReason::CircuitOpen,
        state => UnavailableReason::NotReady(state),
    };
    DispatchOutcome::BackendUnavailable {
        service: service.to_string(),
        reason,
    }
}
