use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account.
    User,
    /// May run lookups and manage reports.
    Analyst,
    /// Full administrative access.
    Admin,
}

impl Role {
    /// Every role, in default hierarchy order.
    pub const ALL: [Role; 3] = [Role::User, Role::Analyst, Role::Admin];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "analyst" => Ok(Role::Analyst),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Total order over roles, least privileged first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHierarchy {
    ordered: Vec<Role>,
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self { ordered: Role::ALL.to_vec() }
    }
}

impl RoleHierarchy {
    /// Build a hierarchy from roles listed lowest first. Every role must appear exactly once.
    pub fn new(ordered: Vec<Role>) -> Result<Self, ConfigError> {
        for (idx, role) in ordered.iter().enumerate() {
            if ordered[..idx].contains(role) {
                return Err(ConfigError::DuplicateRole(*role));
            }
        }
        if let Some(missing) = Role::ALL.iter().find(|r| !ordered.contains(r)) {
            return Err(ConfigError::MissingRole(*missing));
        }
        Ok(Self { ordered })
    }

    /// Position of `role` in the hierarchy (0 = least privileged).
    pub fn rank(&self, role: Role) -> usize {
        // Construction guarantees presence.
        self.ordered.iter().position(|r| *r == role).unwrap_or(0)
    }

    /// `true` when `role >= required`.
    pub fn satisfies(&self, role: Role, required: Role) -> bool {
        self.rank(role) >= self.rank(required)
    }

    /// Roles lowest first.
    pub fn roles(&self) -> &[Role] {
        &self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_lowercase() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert_eq!("Admin".parse::<Role>(), Err(ParseRoleError("Admin".into())));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Role::Analyst).unwrap();
        assert_eq!(json, "\"analyst\"");
        let back: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(back, Role::Admin);
    }

    #[test]
    fn default_order_is_user_analyst_admin() {
        let h = RoleHierarchy::default();
        assert!(h.satisfies(Role::Admin, Role::Analyst));
        assert!(h.satisfies(Role::Analyst, Role::Analyst));
        assert!(!h.satisfies(Role::User, Role::Analyst));
        assert!(h.rank(Role::User) < h.rank(Role::Admin));
    }

    #[test]
    fn hierarchy_rejects_duplicates_and_gaps() {
        assert!(matches!(
            RoleHierarchy::new(vec![Role::User, Role::User, Role::Admin]),
            Err(ConfigError::DuplicateRole(Role::User))
        ));
        assert!(matches!(
            RoleHierarchy::new(vec![Role::User, Role::Admin]),
            Err(ConfigError::MissingRole(Role::Analyst))
        ));
    }

    #[test]
    fn custom_order_is_honored() {
        let h = RoleHierarchy::new(vec![Role::Analyst, Role::User, Role::Admin]).unwrap();
        assert!(h.satisfies(Role::User, Role::Analyst));
        assert!(!h.satisfies(Role::Analyst, Role::User));
    }
}
