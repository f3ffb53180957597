//! Error types for guarded operations
use std::time::Duration;

use crate::access::Role;
use crate::audit::AuditError;

/// Errors a wrapped operation can report, with the transport status it maps to.
pub trait OperationError: std::error::Error + Send + Sync + 'static {
    /// HTTP status for this failure (400/404/409/500, ...). Defaults to 500.
    fn status_code(&self) -> u16 {
        500
    }
}

impl OperationError for std::convert::Infallible {}

/// Unified error type for the request guard
///
/// Access denials name the minimum role only; they never say which check failed beyond
/// that or what role the caller holds.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum GuardError<E> {
    /// The caller's key has no quota left. Recoverable by waiting; never retried here.
    #[error("rate limit exceeded; retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    /// No resolvable role for the caller.
    #[error("unauthenticated")]
    Unauthenticated,
    /// The caller's role is below the operation's minimum.
    #[error("insufficient role: requires '{required}'")]
    Forbidden { required: Role },
    /// An operation-supplied precondition (e.g. target is not the caller) does not hold.
    #[error("precondition failed: {reason}")]
    PreconditionFailed { reason: String },
    /// The audit store could not record a security-relevant action; nothing ran unaudited.
    #[error("audit write failed: {0}")]
    AuditWrite(#[source] AuditError),
    /// The wrapped operation failed.
    #[error("{0}")]
    Operation(E),
    /// The wrapped operation panicked.
    #[error("operation panicked: {message}")]
    OperationPanicked { message: String },
}

impl<E> GuardError<E> {
    /// Check if this error is a rate-limit rejection
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
    /// Check if the caller had no resolvable role
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
    /// Check if the caller's role was insufficient
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
    /// Check if an operation precondition failed
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
    /// Check if the audit store rejected the write
    pub fn is_audit_failure(&self) -> bool {
        matches!(self, Self::AuditWrite(_))
    }
    /// Check if the wrapped operation failed or panicked
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, Self::Operation(_) | Self::OperationPanicked { .. })
    }
    /// Suggested wait for rate-limit rejections.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
    /// Get the operation error if this is an Operation variant
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the operation error if present.
    pub fn as_operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: OperationError> GuardError<E> {
    /// HTTP status the transport layer must answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::Unauthenticated => 401,
            Self::Forbidden { .. } => 403,
            Self::PreconditionFailed { .. } => 400,
            Self::AuditWrite(_) => 503,
            Self::Operation(e) => e.status_code(),
            Self::OperationPanicked { .. } => 500,
        }
    }
}
