//! Backing store reachability.
//!
//! # Responsibilities
//! - Answer "is the database reachable right now" for readiness
//! - Satisfy the reserved `store` dependency of services
//!
//! # Design Decisions
//! - The gateway never queries domain data; it only pings
//! - Probing sits behind a trait so readiness can be exercised without a database

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use postgres::PgStoreProbe;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("timed out waiting for a store connection")]
    Timeout,
}

/// Reachability check for the shared store.
#[async_trait]
pub trait StoreProbe: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}
