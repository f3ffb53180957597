use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::entry::{sort_newest_first, AuditEntry, AuditFilter, EntryId};
use super::AuditError;

/// Durable, append-only storage behind an [`AuditLog`](super::AuditLog).
///
/// Implementations serialize their own writes so entries never interleave, and must not
/// return from `append` before the entry is durable.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one entry.
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Up to `limit` entries matching `filter`, newest first.
    async fn scan(&self, filter: &AuditFilter, limit: usize)
        -> Result<Vec<AuditEntry>, AuditError>;

    /// Highest id ever stored, used to resume numbering after a restart.
    async fn last_id(&self) -> Result<Option<EntryId>, AuditError>;
}

/// In-memory audit store (tests/diagnostics).
///
/// Can be switched unavailable to exercise store-outage paths.
#[derive(Clone, Debug)]
pub struct MemoryAuditStore {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self { entries: Arc::new(Mutex::new(Vec::new())), available: Arc::new(AtomicBool::new(true)) }
    }
}

impl MemoryAuditStore {
    /// Create an empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects every call until made available.
    pub fn unavailable() -> Self {
        let store = Self::default();
        store.set_available(false);
        store
    }

    /// Toggle simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// All stored entries in append order.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// `true` when nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn ensure_available(&self) -> Result<(), AuditError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AuditError::Unavailable("memory store offline".into()))
        }
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.ensure_available()?;
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn scan(
        &self,
        filter: &AuditFilter,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.ensure_available()?;
        let mut found: Vec<AuditEntry> =
            self.entries.lock().await.iter().filter(|e| e.matches(filter)).cloned().collect();
        sort_newest_first(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    async fn last_id(&self) -> Result<Option<EntryId>, AuditError> {
        self.ensure_available()?;
        Ok(self.entries.lock().await.iter().map(|e| e.id).max())
    }
}
