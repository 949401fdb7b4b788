//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! DispatchRequest (buffered, with deadline)
//!     → dispatcher.rs (route, health check, permit, admission)
//!     → resilience layer (timeouts, retries)
//!     → outcome.rs (Success / UpstreamError / BackendUnavailable / Timeout / Unroutable)
//! ```

pub mod dispatcher;
pub mod outcome;
pub mod request;

pub use dispatcher::Dispatcher;
pub use outcome::{DispatchOutcome, RelayedResponse, UnavailableReason};
pub use request::DispatchRequest;
