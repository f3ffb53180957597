use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

use super::action::Action;

/// Identifier assigned by the audit log; strictly increasing in assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded action. This is also the persisted layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the log.
    pub id: EntryId,
    /// Who acted.
    pub actor_id: String,
    /// What they did.
    pub action: Action,
    /// What they did it to (`"user:42"`, a looked-up domain, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Free-form detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Where the request came from.
    pub source_address: String,
    /// Milliseconds since the Unix epoch, assigned by the log.
    pub timestamp_millis: u64,
}

impl AuditEntry {
    /// `true` when the entry passes every constraint in `filter`.
    pub fn matches(&self, filter: &AuditFilter) -> bool {
        if matches!(filter.actor.as_deref(), Some(a) if a != self.actor_id) {
            return false;
        }
        if matches!(&filter.action, Some(a) if *a != self.action) {
            return false;
        }
        !matches!(filter.since, Some(s) if self.timestamp_millis < s)
            && !matches!(filter.until, Some(u) if self.timestamp_millis > u)
    }
}

/// Sort newest first: timestamp descending, ties by id descending.
pub fn sort_newest_first(entries: &mut [AuditEntry]) {
    entries.sort_by_key(|e| Reverse((e.timestamp_millis, e.id)));
}

/// An entry as supplied by callers, before the log assigns id and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub(crate) actor_id: String,
    pub(crate) action: Action,
    pub(crate) target: Option<String>,
    pub(crate) details: Option<String>,
    pub(crate) source_address: String,
}

impl NewAuditEntry {
    pub fn new(actor_id: impl Into<String>, action: Action) -> Self {
        Self {
            actor_id: actor_id.into(),
            action,
            target: None,
            details: None,
            source_address: String::new(),
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn source_address(mut self, addr: impl Into<String>) -> Self {
        self.source_address = addr.into();
        self
    }

    pub(crate) fn into_entry(self, id: EntryId, timestamp_millis: u64) -> AuditEntry {
        AuditEntry {
            id,
            actor_id: self.actor_id,
            action: self.action,
            target: self.target,
            details: self.details,
            source_address: self.source_address,
            timestamp_millis,
        }
    }
}

/// Query constraints; unset fields match everything. Time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub action: Option<Action>,
    pub since: Option<u64>,
    pub until: Option<u64>,
}

impl AuditFilter {
    /// Matches every entry.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn since(mut self, millis: u64) -> Self {
        self.since = Some(millis);
        self
    }

    pub fn until(mut self, millis: u64) -> Self {
        self.until = Some(millis);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, actor: &str, action: Action, ts: u64) -> AuditEntry {
        NewAuditEntry::new(actor, action).source_address("127.0.0.1").into_entry(EntryId(id), ts)
    }

    #[test]
    fn filter_by_each_field() {
        let e = entry(1, "alice", Action::LOGIN, 1_000);
        assert!(e.matches(&AuditFilter::any()));
        assert!(e.matches(&AuditFilter::any().actor("alice")));
        assert!(!e.matches(&AuditFilter::any().actor("bob")));
        assert!(e.matches(&AuditFilter::any().action(Action::LOGIN)));
        assert!(!e.matches(&AuditFilter::any().action(Action::DELETE_USER)));
        assert!(e.matches(&AuditFilter::any().since(1_000).until(1_000)));
        assert!(!e.matches(&AuditFilter::any().since(1_001)));
        assert!(!e.matches(&AuditFilter::any().until(999)));
    }

    #[test]
    fn newest_first_breaks_ties_by_id() {
        let mut v = vec![
            entry(1, "a", Action::LOGIN, 10),
            entry(3, "a", Action::LOGIN, 20),
            entry(2, "a", Action::LOGIN, 20),
        ];
        sort_newest_first(&mut v);
        let ids: Vec<u64> = v.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn optional_fields_are_omitted_on_the_wire() {
        let json = serde_json::to_value(entry(7, "a", Action::LOGIN, 5)).unwrap();
        assert!(json.get("target").is_none());
        assert_eq!(json["action"], "login");
        assert_eq!(json["id"], 7);
    }
}
