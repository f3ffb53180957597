use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Name of an audited action (`"login"`, `"delete_user"`, ...).
///
/// The associated constants cover the actions the service performs; [`Action::new`] admits
/// anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Cow<'static, str>);

impl Action {
    pub const LOGIN: Action = Action::fixed("login");
    pub const UPDATE_USER_ROLE: Action = Action::fixed("update_user_role");
    pub const DELETE_USER: Action = Action::fixed("delete_user");
    pub const USERNAME_LOOKUP: Action = Action::fixed("username_lookup");
    pub const IP_LOOKUP: Action = Action::fixed("ip_lookup");
    pub const DOMAIN_LOOKUP: Action = Action::fixed("domain_lookup");
    pub const EMAIL_LOOKUP: Action = Action::fixed("email_lookup");
    pub const PHONE_LOOKUP: Action = Action::fixed("phone_lookup");
    pub const IMAGE_ANALYSIS: Action = Action::fixed("image_analysis");
    pub const WEB_SCRAPE: Action = Action::fixed("web_scrape");
    pub const CREATE_REPORT: Action = Action::fixed("create_report");
    pub const VIEW_REPORT: Action = Action::fixed("view_report");
    pub const UPDATE_REPORT: Action = Action::fixed("update_report");
    pub const DELETE_REPORT: Action = Action::fixed("delete_report");
    pub const EXPORT_REPORT: Action = Action::fixed("export_report");

    const fn fixed(name: &'static str) -> Self {
        Action(Cow::Borrowed(name))
    }

    /// Custom action name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Action(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Irreversible actions. Their audit record must be durable before the mutation commits.
    pub fn is_destructive(&self) -> bool {
        matches!(self.as_str(), "delete_user" | "delete_report")
    }

    /// Actions that never run unaudited, whatever the audit failure policy says.
    pub fn is_security_relevant(&self) -> bool {
        self.is_destructive() || matches!(self.as_str(), "login" | "update_user_role")
    }

    /// Security-relevant actions that change stored state. Recorded before the operation runs.
    pub fn mutates_security_state(&self) -> bool {
        self.is_destructive() || self.as_str() == "update_user_role"
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for Action {
    fn from(name: &'static str) -> Self {
        Action::fixed(name)
    }
}
