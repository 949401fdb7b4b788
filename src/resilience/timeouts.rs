//! Deadline enforcement.
//!
//! # Responsibilities
//! - Carry an absolute deadline with every dispatch
//! - Derive the downstream deadline from the inbound one
//! - Cancel operations cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timer so expiry drops the in-flight future (and with it the
//!   pooled connection and any held permit)
//! - Deadlines are absolute: retries and permit waits share one budget

use std::future::Future;
use std::time::Duration;

use tokio::time::{error::Elapsed, Instant};

/// Absolute point in time by which an operation must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The same deadline moved `margin` earlier, so the caller keeps time to
    /// relay the result.
    pub fn shortened_by(&self, margin: Duration) -> Self {
        let now = Instant::now();
        match self.0.checked_sub(margin) {
            Some(earlier) if earlier > now => Self(earlier),
            _ => Self(now),
        }
    }
}

/// Run `fut` until the deadline.
pub async fn with_deadline<F>(deadline: Deadline, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout_at(deadline.instant(), fut).await
}
