//! Role-based access control.
//!
//! The gate answers one question: does the caller's role reach the role an operation
//! requires? Identity is resolved upstream; the gate trusts the `(caller_id, role)` pair it
//! is handed. Roles are ordered by a [`RoleHierarchy`] (default `user < analyst < admin`).
//!
//! Self-protection rules ("an admin may not delete their own account") are not the gate's
//! business: operations attach a [`Precondition`] and the request guard checks it after
//! authorization, for every role.

pub mod directory;
pub mod gate;
pub mod role;

pub use directory::{InMemoryRoleDirectory, RoleDirectory};
pub use gate::{AccessDecision, AccessGate, Caller, DenyReason, Precondition, ANONYMOUS_ACTOR};
pub use role::{ParseRoleError, Role, RoleHierarchy};
