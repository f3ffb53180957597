//! The request guard: rate limit, authorize, run, audit.
//!
//! A [`ProtectedAction`] describes an operation as data (its audit [`Action`](crate::audit::Action),
//! minimum role, target, precondition and audit rules). [`RequestGuard::guard`] runs the
//! operation behind the limiter and the access gate and makes the audit write a fixed step
//! of every call.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tollgate::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let limiter = Arc::new(SlidingWindowLimiter::new(
//!     LimiterConfig::with_default_sweep(100, Duration::from_secs(3600)).unwrap(),
//! ));
//! let (log, _store) = AuditLog::in_memory();
//! let guard = RequestGuard::builder()
//!     .limiter(limiter)
//!     .audit_log(Arc::new(log))
//!     .on_audit_failure(AuditFailurePolicy::Abort)
//!     .build()
//!     .unwrap();
//!
//! let caller = Caller::new("7", Role::Analyst, "203.0.113.9");
//! let action = ProtectedAction::lookup(Action::DOMAIN_LOOKUP, "example.com");
//! let answer = guard
//!     .guard("7", &caller, &action, || async { Ok::<_, std::io::Error>("93.184.216.34") })
//!     .await
//!     .unwrap();
//! assert_eq!(answer, "93.184.216.34");
//! # }
//! ```

mod action;
mod request;

pub use crate::error::OperationError;
pub use action::{AuditPolicy, ProtectedAction, WriteTiming};
pub use request::{AuditFailurePolicy, RequestGuard, RequestGuardBuilder};
