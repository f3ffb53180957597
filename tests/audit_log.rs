mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::test_helpers::CapturedLogs;
use tollgate::audit::{
    Action, AuditFilter, AuditLog, EntryId, NewAuditEntry, DEFAULT_QUERY_LIMIT,
};
use tollgate::clock::ManualClock;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_get_unique_increasing_ids() {
    let (log, store) = AuditLog::in_memory();
    let log = Arc::new(log);

    let mut handles = Vec::new();
    for i in 0..200 {
        let log = log.clone();
        handles.push(tokio::spawn(async move {
            log.append(NewAuditEntry::new(format!("u{}", i % 5), Action::IP_LOOKUP)).await.unwrap()
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    let unique: HashSet<EntryId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 200);
    assert_eq!(ids.iter().max(), Some(&EntryId(200)));
    assert_eq!(store.len().await, 200);
}

#[tokio::test]
async fn newest_first_matches_insertion_order_even_on_equal_timestamps() {
    let clock = ManualClock::new(42);
    let (log, _store) = AuditLog::in_memory_with_clock(Arc::new(clock.clone()));
    for _ in 0..5 {
        log.append(NewAuditEntry::new("a", Action::VIEW_REPORT)).await.unwrap();
    }
    let ids: Vec<u64> = log.recent().await.unwrap().iter().map(|e| e.id.0).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn filters_by_actor_action_and_time_range() {
    let clock = ManualClock::new(0);
    let (log, _store) = AuditLog::in_memory_with_clock(Arc::new(clock.clone()));
    let rows = [
        (100, "alice", Action::LOGIN),
        (200, "bob", Action::LOGIN),
        (300, "alice", Action::DELETE_REPORT),
        (400, "alice", Action::LOGIN),
    ];
    for (t, actor, action) in rows {
        clock.set(t);
        log.append(NewAuditEntry::new(actor, action)).await.unwrap();
    }

    let alice_logins = log
        .query(&AuditFilter::any().actor("alice").action(Action::LOGIN), 10)
        .await
        .unwrap();
    assert_eq!(alice_logins.iter().map(|e| e.timestamp_millis).collect::<Vec<_>>(), vec![400, 100]);

    let middle = log.query(&AuditFilter::any().since(200).until(300), 10).await.unwrap();
    assert_eq!(middle.len(), 2);
    assert_eq!(middle[0].action, Action::DELETE_REPORT);
}

#[tokio::test]
async fn admin_listing_is_capped() {
    let (log, _store) = AuditLog::in_memory();
    for _ in 0..(DEFAULT_QUERY_LIMIT + 20) {
        log.append(NewAuditEntry::new("x", Action::WEB_SCRAPE)).await.unwrap();
    }
    let recent = log.recent().await.unwrap();
    assert_eq!(recent.len(), DEFAULT_QUERY_LIMIT);
    assert_eq!(recent[0].id, EntryId(DEFAULT_QUERY_LIMIT as u64 + 20));
}

#[tokio::test]
async fn store_outage_is_reported_not_swallowed() {
    let (log, store) = AuditLog::in_memory();
    store.set_available(false);
    assert!(log.append(NewAuditEntry::new("a", Action::DELETE_USER)).await.is_err());
    assert!(log.recent().await.is_err());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn appends_are_mirrored_to_tracing() {
    let logs = CapturedLogs::default();
    let _default = tracing::subscriber::set_default(logs.subscriber());

    let (log, _store) = AuditLog::in_memory();
    log.append(
        NewAuditEntry::new("admin-1", Action::DELETE_USER)
            .target("user:9")
            .source_address("203.0.113.7"),
    )
    .await
    .unwrap();

    let out = logs.contents();
    assert!(out.contains("activity logged"), "{out}");
    assert!(out.contains("tollgate::audit"));
    assert!(out.contains("delete_user"));
    assert!(out.contains("user:9"));
}
