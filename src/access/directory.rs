use dashmap::DashMap;
use tracing::debug;

use super::role::Role;

/// Pluggable lookup from caller id to role (account store, token claims, ...).
pub trait RoleDirectory: Send + Sync {
    /// Role of `caller_id`, or `None` if the account is unknown.
    fn role_of(&self, caller_id: &str) -> Option<Role>;
}

/// In-memory directory (tests / single-node deployments).
#[derive(Debug, Default)]
pub struct InMemoryRoleDirectory {
    roles: DashMap<String, Role>,
}

impl InMemoryRoleDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign or replace a caller's role. Returns the previous role, if any.
    pub fn assign(&self, caller_id: impl Into<String>, role: Role) -> Option<Role> {
        let caller_id = caller_id.into();
        debug!(target: "tollgate::access", caller = %caller_id, role = %role, "role assigned");
        self.roles.insert(caller_id, role)
    }

    /// Forget a caller entirely.
    pub fn remove(&self, caller_id: &str) -> Option<Role> {
        self.roles.remove(caller_id).map(|(_, role)| role)
    }

    /// Number of known callers.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// `true` when no callers are known.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn role_of(&self, caller_id: &str) -> Option<Role> {
        self.roles.get(caller_id).map(|r| *r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Caller;

    #[test]
    fn resolve_known_and_removed_callers() {
        let dir = InMemoryRoleDirectory::new();
        assert_eq!(dir.assign("42", Role::Analyst), None);
        assert_eq!(dir.assign("42", Role::Admin), Some(Role::Analyst));

        let caller = Caller::resolve(&dir, "42", "10.0.0.9");
        assert_eq!(caller.role, Some(Role::Admin));

        dir.remove("42");
        let caller = Caller::resolve(&dir, "42", "10.0.0.9");
        assert_eq!(caller.id.as_deref(), Some("42"));
        assert_eq!(caller.role, None);
        assert!(dir.is_empty());
    }
}
