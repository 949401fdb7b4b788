//! Circuit breaker for backend protection.
//!
//! # States (see `health::state`)
//! - Ready / Degraded: requests pass through
//! - Unreachable: backend assumed down, requests fail fast
//! - Starting after Unreachable: a single probe is testing recovery
//!
//! # State Transitions
//! ```text
//! Ready → Degraded: first consecutive failure
//! Ready/Degraded → Unreachable: consecutive failures >= failure_threshold
//! Degraded → Ready: any success
//! Unreachable → Starting: cooldown elapsed, one caller wins the probe slot
//! Starting → Ready: probe succeeds
//! Starting → Unreachable: probe fails (fresh cooldown)
//! ```
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global)
//! - Fail fast while open (no waiting for timeout, no network attempt)
//! - Single probe after cooldown, guarded so an abandoned probe reopens the circuit

use std::time::Duration;

use crate::config::CircuitBreakerConfig;
use crate::health::state::{BackendHealth, HealthState};
use crate::observability::metrics;

/// Result of asking the breaker for permission to call a backend.
#[derive(Debug)]
pub enum Admission<'a> {
    /// Normal traffic.
    Allowed,
    /// This caller holds the single half-open probe slot.
    Probe(ProbeGuard<'a>),
    /// Call must not be attempted; carries the state that caused it.
    Rejected(HealthState),
}

/// Per-backend breaker policy. State lives in the backend's `BackendHealth`.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Side-effect free check: `Some(state)` if a call would be rejected now.
    pub fn would_reject(&self, health: &BackendHealth) -> Option<HealthState> {
        match health.state() {
            HealthState::Ready | HealthState::Degraded => None,
            HealthState::Unreachable if health.open_for() >= self.cooldown => None,
            state => Some(state),
        }
    }

    /// Ask to call the backend. May claim the half-open probe slot.
    pub fn admit<'a>(&self, health: &'a BackendHealth) -> Admission<'a> {
        match health.state() {
            HealthState::Ready | HealthState::Degraded => Admission::Allowed,
            HealthState::Unreachable if health.open_for() >= self.cooldown => {
                if health.transition(HealthState::Unreachable, HealthState::Starting) {
                    tracing::info!(service = %health.service(), "Circuit half-open, probing backend");
                    metrics::record_circuit_transition(health.service(), HealthState::Starting);
                    Admission::Probe(ProbeGuard {
                        health,
                        finished: false,
                    })
                } else {
                    Admission::Rejected(health.state())
                }
            }
            state => Admission::Rejected(state),
        }
    }

    /// Record a successful dispatch.
    pub fn record_success(&self, health: &BackendHealth) {
        health.reset_failures();
        if health.transition(HealthState::Degraded, HealthState::Ready) {
            metrics::record_circuit_transition(health.service(), HealthState::Ready);
        }
    }

    /// Record a failed dispatch and return the resulting state.
    pub fn record_failure(&self, health: &BackendHealth) -> HealthState {
        let failures = health.add_failure();
        loop {
            let current = health.state();
            let target = match current {
                HealthState::Ready | HealthState::Degraded if failures >= self.failure_threshold => {
                    HealthState::Unreachable
                }
                HealthState::Ready => HealthState::Degraded,
                _ => return current,
            };
            if current == target {
                return current;
            }
            if health.transition(current, target) {
                if target == HealthState::Unreachable {
                    tracing::warn!(
                        service = %health.service(),
                        failures,
                        cooldown = ?self.cooldown,
                        "Circuit opened"
                    );
                }
                metrics::record_circuit_transition(health.service(), target);
                return target;
            }
        }
    }
}

/// Holds the half-open probe slot. Dropping it without a verdict (e.g. the
/// client went away mid-probe) reopens the circuit.
#[derive(Debug)]
pub struct ProbeGuard<'a> {
    health: &'a BackendHealth,
    finished: bool,
}

impl ProbeGuard<'_> {
    /// The probe call succeeded: close the circuit.
    pub fn succeed(mut self) {
        self.finished = true;
        self.health.reset_failures();
        if self.health.transition(HealthState::Starting, HealthState::Ready) {
            tracing::info!(service = %self.health.service(), "Circuit closed after successful probe");
            metrics::record_circuit_transition(self.health.service(), HealthState::Ready);
        }
    }

    /// The probe call failed: reopen with a fresh cooldown.
    pub fn fail(mut self) {
        self.finished = true;
        self.reopen();
    }

    fn reopen(&self) {
        self.health.add_failure();
        if self.health.transition(HealthState::Starting, HealthState::Unreachable) {
            metrics::record_circuit_transition(self.health.service(), HealthState::Unreachable);
        }
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(service = %self.health.service(), "Probe abandoned, reopening circuit");
            self.reopen();
        }
    }
}
