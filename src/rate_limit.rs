//! Rate limiting primitives.
//!
//! This module provides the building blocks for rate limiting:
//! - [`RateLimiter`]: The seam the request guard and middleware depend on.
//! - [`SlidingWindowLimiter`]: Per-key true sliding window over admission timestamps.
//! - [`Sweeper`]: Background task reclaiming memory held by idle keys.
//! - [`RateLimitLayer`]: Tower middleware that enforces a limiter keyed per request.
//! - [`Decision`]: The result of a rate limit check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Logic**: `SlidingWindowLimiter` keeps a [`RateWindow`] per key inside a sharded
//!   concurrent map. Admission prunes, counts and appends under the key's shard lock, so two
//!   requests for the same key can never both observe room for one more.
//! - **Reclamation**: admission-time pruning is authoritative. The sweep only drops keys whose
//!   windows emptied out; a late or skipped sweep costs memory, never correctness.
//! - **Middleware**: `RateLimitLayer` wraps your service. It doesn't know *how* limiting works,
//!   only that it should ask a `RateLimiter`.

use std::time::Duration;

pub mod middleware;
pub mod sliding;
pub mod sweep;
pub mod window;

pub use middleware::{RateLimitError, RateLimitLayer, RateLimitService};
pub use sliding::{SlidingWindowLimiter, SweepReport};
pub use sweep::Sweeper;
pub use window::RateWindow;

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request is admitted and counted against the key's quota.
    Allowed {
        /// Admissions left in the current window after this one.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is denied. Denials never change limiter state.
    Denied {
        /// How long until the oldest counted admission leaves the window.
        /// Useful for `Retry-After` headers.
        retry_after: Duration,
        /// Reason for denial (e.g., "window_full", "limit_zero").
        reason: &'static str,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Suggested wait, if denied.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Decision::Denied { retry_after, .. } => Some(*retry_after),
            Decision::Allowed { .. } => None,
        }
    }
}

/// Core interface for per-key admission.
///
/// Implementations read time from their own clock; `check` is total and must complete in
/// bounded time without I/O.
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key`, or deny it.
    fn check(&self, key: &str) -> Decision;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_helpers() {
        let allowed = Decision::Allowed { remaining: 2 };
        assert!(allowed.is_allowed());
        assert_eq!(allowed.retry_after(), None);

        let denied =
            Decision::Denied { retry_after: Duration::from_millis(250), reason: "window_full" };
        assert!(!denied.is_allowed());
        assert_eq!(denied.retry_after(), Some(Duration::from_millis(250)));
    }
}
