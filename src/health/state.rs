//! Backend health state machine.
//!
//! # States
//! - Unknown: not yet seen by the startup coordinator
//! - Starting: waiting for dependencies or for a first successful probe,
//!   or running the single half-open probe after a circuit trip
//! - Ready: serving traffic
//! - Degraded: recent failures, still under the trip threshold, still serving
//! - Unreachable: circuit open, calls rejected until the cooldown elapses
//!
//! # State Transitions
//! ```text
//! Unknown → Starting → Ready ⇄ Degraded → Unreachable → (probe) → Starting
//! ```
//!
//! # Design Decisions
//! - One fixed-size record per backend, every field atomic
//! - Transitions are compare-and-swap; a lost race is reported, never a lost update
//! - No cross-backend locking: each backend owns its record

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Health of a single backend.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown = 0,
    Starting = 1,
    Ready = 2,
    Degraded = 3,
    Unreachable = 4,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Starting,
            2 => HealthState::Ready,
            3 => HealthState::Degraded,
            4 => HealthState::Unreachable,
            _ => HealthState::Unknown,
        }
    }
}

impl HealthState {
    /// Whether ordinary traffic may be sent.
    pub fn is_serving(self) -> bool {
        matches!(self, HealthState::Ready | HealthState::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Starting => "starting",
            HealthState::Ready => "ready",
            HealthState::Degraded => "degraded",
            HealthState::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic health record for one backend.
#[derive(Debug)]
pub struct BackendHealth {
    service: String,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    /// Milliseconds since `epoch` at which the circuit last opened.
    opened_at_ms: AtomicU64,
    /// Set once the backend has been Ready at least once.
    reached: AtomicBool,
    epoch: Instant,
}

impl BackendHealth {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            reached: AtomicBool::new(false),
            epoch: Instant::now(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    /// Atomically move from `from` to `to`. Returns false if another task
    /// changed the state first.
    pub fn transition(&self, from: HealthState, to: HealthState) -> bool {
        // Stamp before publishing so no reader sees Unreachable with a stale time.
        if to == HealthState::Unreachable && self.state() == from {
            self.opened_at_ms.store(self.elapsed_ms(), Ordering::Release);
        }
        let swapped = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if swapped {
            if to == HealthState::Ready {
                self.reached.store(true, Ordering::Release);
            }
            if from != to {
                tracing::info!(service = %self.service, from = %from, to = %to, "Backend health changed");
            }
        }
        swapped
    }

    /// Whether the backend has ever been Ready.
    pub fn has_been_ready(&self) -> bool {
        self.reached.load(Ordering::Acquire)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Increment the failure streak and return the new length.
    pub fn add_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Time since the circuit last opened.
    pub fn open_for(&self) -> Duration {
        let opened = self.opened_at_ms.load(Ordering::Acquire);
        Duration::from_millis(self.elapsed_ms().saturating_sub(opened))
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
