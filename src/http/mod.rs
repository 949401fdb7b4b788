//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → status.rs (gateway endpoints: /, /health, /ready, /api-docs)
//!     → request.rs (request ID, buffer into DispatchRequest)
//!     → [dispatcher routes and calls the backend]
//!     → response.rs (relay, or map failure to status + JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{GatewayRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
