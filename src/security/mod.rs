//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → body limit and CORS layers (http/server.rs)
//!     → limits.rs (413 when a buffered body overflows)
//!     → headers.rs (sanitize, add X-Forwarded-*)
//!     → Pass to dispatch
//! Backend response:
//!     → limits.rs (502 when the body overflows)
//!     → headers.rs (strip hop-by-hop)
//! ```
//!
//! # Design Decisions
//! - No trust in client input: hop-by-hop headers never cross the gateway

pub mod headers;
pub mod limits;

pub use headers::{forward_headers, strip_hop_by_hop};
pub use limits::exceeds_length_limit;
