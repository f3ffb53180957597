//! Convenient re-exports for common Tollgate types.
pub use crate::{
    access::{AccessDecision, AccessGate, Caller, DenyReason, Precondition, Role, RoleHierarchy},
    audit::{Action, AuditEntry, AuditError, AuditFilter, AuditLog, AuditStore, EntryId, NewAuditEntry},
    clock::{Clock, ManualClock, MonotonicClock, SystemClock},
    config::{ConfigError, GuardSettings, LimiterConfig, LimiterSettings},
    error::{GuardError, OperationError},
    guard::{AuditFailurePolicy, AuditPolicy, ProtectedAction, RequestGuard, WriteTiming},
    rate_limit::{Decision, RateLimitLayer, RateLimiter, SlidingWindowLimiter, Sweeper},
};
