use std::fmt;
use std::time::Duration;

use crate::access::DenyReason;
use crate::audit::{Action, EntryId};

/// Events emitted while a request moves through the guard.
///
/// One guarded call produces an admission event, then at most one access, audit and
/// operation event each (a before-effect action emits its audit event ahead of the
/// operation event).
#[derive(Debug, Clone, PartialEq)]
pub enum GuardEvent {
    /// Rate limiter verdict
    Admission(AdmissionEvent),
    /// Authorization and precondition denials
    Access(AccessEvent),
    /// Audit trail writes
    Audit(AuditEvent),
    /// Outcome of the wrapped operation
    Operation(OperationEvent),
}

/// Events emitted by the rate-limit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionEvent {
    /// The key had quota left; one slot was consumed.
    Admitted {
        /// Rate-limit key
        key: String,
        /// Slots left in the window
        remaining: u32,
    },
    /// The key's window was full.
    RateLimited {
        /// Rate-limit key
        key: String,
        /// Time until a slot frees up
        retry_after: Duration,
    },
}

/// Events emitted by the access step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessEvent {
    /// The gate refused the caller.
    Denied { actor: String, action: Action, reason: DenyReason },
    /// The caller was authorized but an operation precondition did not hold.
    PreconditionFailed { actor: String, action: Action },
}

/// Events emitted when writing to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// The entry is durable.
    Appended { entry_id: EntryId, action: Action },
    /// The store rejected the entry.
    Failed { action: Action, error: String },
}

/// Events describing the wrapped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    /// Returned `Ok`.
    Succeeded { action: Action, duration: Duration },
    /// Returned `Err` or panicked.
    Failed { action: Action, duration: Duration, panicked: bool },
}

impl fmt::Display for GuardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardEvent::Admission(e) => write!(f, "Admission::{}", e),
            GuardEvent::Access(e) => write!(f, "Access::{}", e),
            GuardEvent::Audit(e) => write!(f, "Audit::{}", e),
            GuardEvent::Operation(e) => write!(f, "Operation::{}", e),
        }
    }
}

impl fmt::Display for AdmissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionEvent::Admitted { key, remaining } => {
                write!(f, "Admitted(key={}, remaining={})", key, remaining)
            }
            AdmissionEvent::RateLimited { key, retry_after } => {
                write!(f, "RateLimited(key={}, retry_after={:?})", key, retry_after)
            }
        }
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessEvent::Denied { actor, action, reason } => {
                write!(f, "Denied(actor={}, action={}, reason={})", actor, action, reason)
            }
            AccessEvent::PreconditionFailed { actor, action } => {
                write!(f, "PreconditionFailed(actor={}, action={})", actor, action)
            }
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::Appended { entry_id, action } => {
                write!(f, "Appended(id={}, action={})", entry_id, action)
            }
            AuditEvent::Failed { action, error } => {
                write!(f, "Failed(action={}, error={})", action, error)
            }
        }
    }
}

impl fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationEvent::Succeeded { action, duration } => {
                write!(f, "Succeeded(action={}, duration={:?})", action, duration)
            }
            OperationEvent::Failed { action, duration, panicked } => {
                write!(
                    f,
                    "Failed(action={}, duration={:?}, panicked={})",
                    action, duration, panicked
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;

    #[test]
    fn admission_display() {
        let event = GuardEvent::Admission(AdmissionEvent::RateLimited {
            key: "10.0.0.1".into(),
            retry_after: Duration::from_secs(2),
        });
        let text = event.to_string();
        assert!(text.starts_with("Admission::RateLimited"));
        assert!(text.contains("10.0.0.1"));
    }

    #[test]
    fn denial_display_carries_reason() {
        let event = AccessEvent::Denied {
            actor: "u7".into(),
            action: Action::DELETE_USER,
            reason: DenyReason::InsufficientRole { required: Role::Admin },
        };
        assert!(event.to_string().contains("requires role 'admin'"));
    }

    #[test]
    fn operation_failure_display() {
        let event = OperationEvent::Failed {
            action: Action::WEB_SCRAPE,
            duration: Duration::from_millis(4),
            panicked: true,
        };
        assert!(event.to_string().contains("panicked=true"));
    }
}
