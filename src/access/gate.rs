use std::fmt;

use super::directory::RoleDirectory;
use super::role::{Role, RoleHierarchy};

/// Actor id recorded for callers without a resolved identity.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Why a caller was refused.
///
/// Rendered reasons name the minimum role only; they never reveal the caller's own role.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DenyReason {
    /// No resolvable role for the caller.
    Unauthenticated,
    /// Role is below the required minimum.
    InsufficientRole {
        /// Minimum role the operation needs.
        required: Role,
    },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated => f.write_str("unauthenticated"),
            DenyReason::InsufficientRole { required } => write!(f, "requires role '{required}'"),
        }
    }
}

/// Outcome of a single authorization check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether the caller may proceed.
    pub allowed: bool,
    /// Set when `allowed` is false.
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    fn deny(reason: DenyReason) -> Self {
        Self { allowed: false, reason: Some(reason) }
    }
}

/// Resolved identity of the caller, as handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Caller id; `None` when the request carries no identity.
    pub id: Option<String>,
    /// Resolved role; `None` when the id maps to no known account.
    pub role: Option<Role>,
    /// Network address the request came from.
    pub source_address: String,
}

impl Caller {
    /// Authenticated caller with a known role.
    pub fn new(id: impl Into<String>, role: Role, source_address: impl Into<String>) -> Self {
        Self { id: Some(id.into()), role: Some(role), source_address: source_address.into() }
    }

    /// Caller without identity.
    pub fn anonymous(source_address: impl Into<String>) -> Self {
        Self { id: None, role: None, source_address: source_address.into() }
    }

    /// Look the caller's role up in `directory`. Unknown ids keep their id but get no role.
    pub fn resolve(
        directory: &dyn RoleDirectory,
        id: impl Into<String>,
        source_address: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let role = directory.role_of(&id);
        Self { id: Some(id), role, source_address: source_address.into() }
    }

    /// Id written to audit entries.
    pub fn actor_id(&self) -> &str {
        self.id.as_deref().unwrap_or(ANONYMOUS_ACTOR)
    }
}

/// Operation-supplied check run after authorization and before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Precondition {
    /// The operation's target must not be the caller (e.g. deleting one's own account).
    TargetNotCaller {
        /// Id of the account the operation acts on.
        target_id: String,
    },
}

impl Precondition {
    /// `Err(reason)` when the precondition does not hold for `caller`.
    pub fn check(&self, caller: &Caller) -> Result<(), String> {
        match self {
            Precondition::TargetNotCaller { target_id } => {
                if caller.id.as_deref() == Some(target_id.as_str()) {
                    Err("operation may not target the calling account".into())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Compares caller roles against required roles.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    hierarchy: RoleHierarchy,
}

impl AccessGate {
    /// Gate using a custom hierarchy.
    pub fn new(hierarchy: RoleHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Allowed iff `role >= required`; a missing role is always denied as unauthenticated.
    pub fn authorize(&self, role: Option<Role>, required: Role) -> AccessDecision {
        match role {
            None => AccessDecision::deny(DenyReason::Unauthenticated),
            Some(role) if self.hierarchy.satisfies(role, required) => AccessDecision::allow(),
            Some(_) => AccessDecision::deny(DenyReason::InsufficientRole { required }),
        }
    }

    /// The hierarchy in force.
    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }
}
