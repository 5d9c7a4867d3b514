//! Explicit deadline values passed through the request pipeline.

use std::time::Duration;
use tokio::time::Instant;

/// An absolute point in time after which an in-flight operation must be
/// abandoned and reported as timed out.
///
/// A deadline is always computed from "now + fixed budget" and handed to an
/// operation as an argument. Sibling operations derive their own deadlines
/// independently; none inherits a parent's remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    /// The expiry instant, for use with `tokio::time::timeout_at`.
    pub fn instant(&self) -> Instant {
        self.expires_at
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Remaining budget, zero once elapsed.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
