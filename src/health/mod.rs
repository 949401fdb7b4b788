//! Health subsystem.
//!
//! # Data Flow
//! ```text
//! Active probes (active.rs):
//!     Startup coordinator tick
//!     → Probe backends whose dependencies are serving
//!     → Update state.rs
//!
//! Dispatch results:
//!     Circuit breaker records success/failure
//!     → Update state.rs (Degraded / Unreachable)
//!
//! State machine (state.rs):
//!     Unknown → Starting → Ready ⇄ Degraded → Unreachable → Starting
//! ```
//!
//! # Design Decisions
//! - Probes and live traffic feed the same per-backend record
//! - Health state is per-backend, not global

pub mod active;
pub mod state;

pub use active::HealthProber;
pub use state::{BackendHealth, HealthState};
