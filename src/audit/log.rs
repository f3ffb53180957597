use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info};

use super::entry::{sort_newest_first, AuditEntry, AuditFilter, EntryId, NewAuditEntry};
use super::store::{AuditStore, MemoryAuditStore};
use super::AuditError;
use crate::clock::{Clock, SystemClock};

/// Default page size for administrative listings.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

#[derive(Debug)]
struct Stamp {
    next_id: u64,
    last_millis: u64,
}

/// The audit trail's single write path.
///
/// Id and timestamp are assigned together under a short lock that never spans I/O, so
/// `(timestamp, id)` order always equals assignment order. The store write happens after
/// the lock is released; concurrent appends only contend on the store's own serialization.
///
/// An append whose store write fails consumes its id. Ids stay unique and increasing but
/// may have gaps.
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    stamp: Mutex<Stamp>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").field("clock", &self.clock).field("stamp", &self.stamp).finish()
    }
}

impl AuditLog {
    /// Attach to `store`, resuming id numbering and timestamps after whatever it already holds.
    pub async fn open(store: Arc<dyn AuditStore>, clock: Arc<dyn Clock>) -> Result<Self, AuditError> {
        let next_id = store.last_id().await?.map_or(1, |id| id.0.saturating_add(1));
        let last_millis = store
            .scan(&AuditFilter::any(), 1)
            .await?
            .first()
            .map_or(0, |e| e.timestamp_millis);
        Ok(Self { store, clock, stamp: Mutex::new(Stamp { next_id, last_millis }) })
    }

    /// Fresh log over a new [`MemoryAuditStore`] using the system clock.
    ///
    /// Returns the store handle too, for inspection in tests.
    pub fn in_memory() -> (Self, MemoryAuditStore) {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    /// Fresh in-memory log with an explicit clock.
    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> (Self, MemoryAuditStore) {
        let store = MemoryAuditStore::new();
        let log = Self {
            store: Arc::new(store.clone()),
            clock,
            stamp: Mutex::new(Stamp { next_id: 1, last_millis: 0 }),
        };
        (log, store)
    }

    /// Record an action. Returns once the store reports the entry durable.
    pub async fn append(&self, new: NewAuditEntry) -> Result<EntryId, AuditError> {
        let entry = {
            // Stamp holds plain integers; a poisoned guard is still consistent.
            let mut stamp = self.stamp.lock().unwrap_or_else(PoisonError::into_inner);
            let now = self.clock.now_millis().max(stamp.last_millis);
            let id = EntryId(stamp.next_id);
            stamp.next_id = stamp.next_id.saturating_add(1);
            stamp.last_millis = now;
            new.into_entry(id, now)
        };

        match self.store.append(&entry).await {
            Ok(()) => {
                info!(
                    target: "tollgate::audit",
                    entry_id = %entry.id,
                    actor = %entry.actor_id,
                    action = %entry.action,
                    target_ref = entry.target.as_deref().unwrap_or("-"),
                    source = %entry.source_address,
                    "activity logged"
                );
                Ok(entry.id)
            }
            Err(e) => {
                error!(
                    target: "tollgate::audit",
                    entry_id = %entry.id,
                    actor = %entry.actor_id,
                    action = %entry.action,
                    error = %e,
                    "audit append failed"
                );
                Err(e)
            }
        }
    }

    /// Entries matching `filter`, newest first, at most `limit`.
    pub async fn query(
        &self,
        filter: &AuditFilter,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let mut found = self.store.scan(filter, limit).await?;
        sort_newest_first(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    /// The most recent [`DEFAULT_QUERY_LIMIT`] entries.
    pub async fn recent(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.query(&AuditFilter::any(), DEFAULT_QUERY_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Action;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn ids_increase_and_time_never_regresses() {
        let clock = ManualClock::new(5_000);
        let (log, store) = AuditLog::in_memory_with_clock(Arc::new(clock.clone()));

        let a = log.append(NewAuditEntry::new("u1", Action::LOGIN)).await.unwrap();
        clock.set(1_000);
        let b = log.append(NewAuditEntry::new("u1", Action::IP_LOOKUP)).await.unwrap();
        assert!(b > a);

        let entries = store.entries().await;
        assert_eq!(entries[1].timestamp_millis, 5_000);
    }

    #[tokio::test]
    async fn failed_append_is_reported_and_burns_id() {
        let (log, store) = AuditLog::in_memory();
        store.set_available(false);
        let err = log.append(NewAuditEntry::new("u1", Action::DELETE_USER)).await.unwrap_err();
        assert!(matches!(err, AuditError::Unavailable(_)));

        store.set_available(true);
        let id = log.append(NewAuditEntry::new("u1", Action::DELETE_USER)).await.unwrap();
        assert_eq!(id, EntryId(2));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn open_resumes_after_existing_entries() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(100));
        let (first, store) = AuditLog::in_memory_with_clock(clock.clone());
        for _ in 0..3 {
            first.append(NewAuditEntry::new("u", Action::LOGIN)).await.unwrap();
        }

        let reopened = AuditLog::open(Arc::new(store), clock).await.unwrap();
        let id = reopened.append(NewAuditEntry::new("u", Action::LOGIN)).await.unwrap();
        assert_eq!(id, EntryId(4));
    }

    #[tokio::test]
    async fn query_filters_and_limits() {
        let clock = ManualClock::new(0);
        let (log, _store) = AuditLog::in_memory_with_clock(Arc::new(clock.clone()));
        for (t, actor) in [(10, "a"), (20, "b"), (30, "a"), (40, "a")] {
            clock.set(t);
            log.append(NewAuditEntry::new(actor, Action::EMAIL_LOOKUP)).await.unwrap();
        }

        let found = log.query(&AuditFilter::any().actor("a").until(30), 10).await.unwrap();
        let times: Vec<u64> = found.iter().map(|e| e.timestamp_millis).collect();
        assert_eq!(times, vec![30, 10]);

        let newest = log.query(&AuditFilter::any(), 1).await.unwrap();
        assert_eq!(newest[0].timestamp_millis, 40);
    }
}
