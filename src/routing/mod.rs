//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-aligned prefix test)
//!     → Return: matched Route or NoRouteMatched
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Check targets against the service registry
//!     → Reject equally specific prefixes
//!     → Sort by specificity and freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: longest prefix wins, ties are impossible by construction

pub mod matcher;
pub mod router;

pub use router::{Route, RouteTable, RoutingError};
