//! Append-only audit trail.
//!
//! [`AuditLog`] is the single write path: it assigns each entry a strictly increasing
//! [`EntryId`] and a timestamp, hands it to a pluggable [`AuditStore`], and mirrors it to
//! `tracing` under the `tollgate::audit` target. There is no update or delete API.
//!
//! Stores are expected to be durable by the time `append` returns; callers that guard
//! destructive operations rely on that to write the record *before* the mutation commits.

pub mod action;
pub mod entry;
pub mod log;
pub mod store;

pub use action::Action;
pub use entry::{sort_newest_first, AuditEntry, AuditFilter, EntryId, NewAuditEntry};
pub use log::{AuditLog, DEFAULT_QUERY_LIMIT};
pub use store::{AuditStore, MemoryAuditStore};

/// Errors produced while writing or reading the audit trail.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum AuditError {
    /// The backing store cannot accept or serve requests.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    /// I/O failure in a file-backed store.
    #[error("audit io: {0}")]
    Io(#[from] std::io::Error),
    /// An entry could not be encoded or decoded.
    #[error("audit serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
