#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Tollgate
//!
//! Request guard primitives for multi-tenant services.
//!
//! ## Features
//!
//! - **Sliding-window rate limiting** per key, sharded so unrelated keys never contend
//! - **Role-based access control** over a configurable `user < analyst < admin` hierarchy
//! - **Append-only audit trail** with pluggable durable stores
//! - **Request guard** composing all three, with the audit write as a mandatory step
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tollgate::prelude::*;
//! use tollgate::presets;
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = Arc::new(presets::api_limiter());
//!     let (log, store) = AuditLog::in_memory();
//!     let guard = RequestGuard::builder()
//!         .limiter(limiter)
//!         .audit_log(Arc::new(log))
//!         .on_audit_failure(AuditFailurePolicy::Abort)
//!         .build()
//!         .unwrap();
//!
//!     let admin = Caller::new("1", Role::Admin, "192.0.2.10");
//!     let result = guard
//!         .guard("1", &admin, &ProtectedAction::delete_user("42"), || async {
//!             Ok::<_, std::io::Error>(())
//!         })
//!         .await;
//!     assert!(result.is_ok());
//!     assert_eq!(store.len().await, 1);
//! }
//! ```

pub mod access;
pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod prelude;
pub mod presets;
pub mod rate_limit;
pub mod telemetry;

// Re-exports
pub use access::{AccessDecision, AccessGate, Caller, DenyReason, Precondition, Role, RoleHierarchy};
pub use audit::{Action, AuditEntry, AuditError, AuditFilter, AuditLog, AuditStore, EntryId};
pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::{ConfigError, LimiterConfig};
pub use error::{GuardError, OperationError};
pub use guard::{AuditFailurePolicy, AuditPolicy, ProtectedAction, RequestGuard, WriteTiming};
pub use rate_limit::{Decision, RateLimiter, SlidingWindowLimiter, Sweeper};
