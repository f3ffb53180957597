use crate::access::{Precondition, Role};
use crate::audit::Action;

/// Which guarded calls produce an audit entry besides those that run the operation.
///
/// Every call that reaches the operation is recorded, successful or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPolicy {
    /// Calls that ran the operation.
    Outcomes,
    /// Those plus access denials (`Unauthenticated`, `Forbidden`, failed preconditions).
    OutcomesAndDenials,
}

/// When the audit entry is written relative to the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTiming {
    /// Record intent before running the operation; the entry stands whatever happens next.
    BeforeEffect,
    /// Record the outcome once the operation returns.
    AfterEffect,
}

/// Describes one protected operation: what it is, who may run it, and how it is audited.
///
/// The required role travels as data. Timing follows from the [`Action`]: actions that
/// change security state (deletions, role changes) are written before the effect, the rest
/// after it. Builder methods can make auditing stricter but never weaker than those defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedAction {
    action: Action,
    required: Option<Role>,
    target: Option<String>,
    details: Option<String>,
    audit: AuditPolicy,
    timing: WriteTiming,
    precondition: Option<Precondition>,
}

impl ProtectedAction {
    /// An action only callers holding at least `required` may run.
    pub fn new(action: Action, required: Role) -> Self {
        let mut protected = Self::public(action);
        protected.required = Some(required);
        protected
    }

    /// An action open to unauthenticated callers. Still rate limited and audited.
    pub fn public(action: Action) -> Self {
        let timing = if action.mutates_security_state() {
            WriteTiming::BeforeEffect
        } else {
            WriteTiming::AfterEffect
        };
        Self {
            action,
            required: None,
            target: None,
            details: None,
            audit: AuditPolicy::Outcomes,
            timing,
            precondition: None,
        }
    }

    /// Credential check. Public; every attempt is audited.
    pub fn login() -> Self {
        Self::public(Action::LOGIN)
    }

    /// One of the lookup tools (`ip_lookup`, `email_lookup`, ...) against `target`.
    pub fn lookup(action: Action, target: impl Into<String>) -> Self {
        Self::new(action, Role::User).target(target)
    }

    /// Change another account's role. Admin only; attempts are audited even when denied.
    pub fn update_user_role(target_id: impl Into<String>, role: Role) -> Self {
        Self::new(Action::UPDATE_USER_ROLE, Role::Admin)
            .target(format!("user:{}", target_id.into()))
            .details(format!("Changed role to {role}"))
            .audit_denials()
    }

    /// Delete another account. Admin only, never the caller's own.
    pub fn delete_user(target_id: impl Into<String>) -> Self {
        let target_id = target_id.into();
        Self::new(Action::DELETE_USER, Role::Admin)
            .target(format!("user:{target_id}"))
            .precondition(Precondition::TargetNotCaller { target_id })
            .audit_denials()
    }

    /// Delete a report.
    pub fn delete_report(report_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(Action::DELETE_REPORT, Role::User)
            .target(format!("report:{}", report_id.into()))
            .details(format!("Deleted report: {}", title.into()))
    }

    pub fn create_report(title: impl Into<String>) -> Self {
        Self::new(Action::CREATE_REPORT, Role::User).details(format!("Created report: {}", title.into()))
    }

    pub fn view_report(report_id: impl Into<String>) -> Self {
        Self::new(Action::VIEW_REPORT, Role::User).target(format!("report:{}", report_id.into()))
    }

    pub fn update_report(report_id: impl Into<String>) -> Self {
        Self::new(Action::UPDATE_REPORT, Role::User).target(format!("report:{}", report_id.into()))
    }

    pub fn export_report(report_id: impl Into<String>) -> Self {
        Self::new(Action::EXPORT_REPORT, Role::User).target(format!("report:{}", report_id.into()))
    }

    /// Set the entry's target.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the entry's details.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Require `precondition` after authorization and before the operation runs.
    pub fn precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Audit access denials too.
    pub fn audit_denials(mut self) -> Self {
        self.audit = AuditPolicy::OutcomesAndDenials;
        self
    }

    /// Record intent before the operation runs, even for a non-destructive action.
    pub fn write_before_effect(mut self) -> Self {
        self.timing = WriteTiming::BeforeEffect;
        self
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Minimum role, `None` for public actions.
    pub fn required(&self) -> Option<Role> {
        self.required
    }

    pub fn target_ref(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn details_ref(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn audit_policy(&self) -> AuditPolicy {
        self.audit
    }

    pub fn timing(&self) -> WriteTiming {
        self.timing
    }

    pub fn precondition_ref(&self) -> Option<&Precondition> {
        self.precondition.as_ref()
    }

    /// Whether a failed or panicked operation gets its own entry. Before-effect actions
    /// already hold their single intent entry.
    pub(crate) fn records_failure(&self) -> bool {
        self.timing == WriteTiming::AfterEffect
    }

    pub(crate) fn audits_denials(&self) -> bool {
        self.audit == AuditPolicy::OutcomesAndDenials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_action() {
        let delete = ProtectedAction::delete_user("42");
        assert_eq!(delete.timing(), WriteTiming::BeforeEffect);
        assert_eq!(delete.required(), Some(Role::Admin));
        assert_eq!(delete.target_ref(), Some("user:42"));
        assert!(delete.precondition_ref().is_some());

        assert!(!delete.records_failure());

        let login = ProtectedAction::login();
        assert_eq!(login.required(), None);
        assert_eq!(login.audit_policy(), AuditPolicy::Outcomes);
        assert_eq!(login.timing(), WriteTiming::AfterEffect);

        let lookup = ProtectedAction::lookup(Action::DOMAIN_LOOKUP, "example.com");
        assert_eq!(lookup.timing(), WriteTiming::AfterEffect);
        assert!(lookup.records_failure());
        assert!(!lookup.audits_denials());
    }

    #[test]
    fn role_changes_are_recorded_before_they_apply() {
        let role_change = ProtectedAction::update_user_role("7", Role::Analyst);
        assert_eq!(role_change.timing(), WriteTiming::BeforeEffect);
        assert_eq!(role_change.audit_policy(), AuditPolicy::OutcomesAndDenials);
        assert_eq!(role_change.details_ref(), Some("Changed role to analyst"));

        let custom = ProtectedAction::new(Action::UPDATE_USER_ROLE, Role::Admin);
        assert_eq!(custom.timing(), WriteTiming::BeforeEffect);
    }

    #[test]
    fn report_helpers_name_their_target() {
        let del = ProtectedAction::delete_report("9", "Q3 findings");
        assert_eq!(del.target_ref(), Some("report:9"));
        assert_eq!(del.details_ref(), Some("Deleted report: Q3 findings"));
        assert_eq!(del.timing(), WriteTiming::BeforeEffect);
        assert_eq!(ProtectedAction::export_report("9").action(), &Action::EXPORT_REPORT);
    }
}
