//! Integration tests for live sync: change feed into the entity store.
//!
//! Drives a workspace against the in-process memory service and checks the
//! initial load, per-owner scoping, quarantine of malformed records, sync
//! health transitions and the visible domain list.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use quicktasks::auth::{Owner, StaticAuth};
use quicktasks::feed::{ChangeFeed, FeedEvent};
use quicktasks::remote::{MemoryRemote, Remote, RemoteError};
use quicktasks::store::{StoreSignal, SyncHealth};
use quicktasks::workspace::{Workspace, WorkspaceOptions};
use quicktasks_proto::domain::Domain;
use quicktasks_proto::record::{Collection, OwnerId, RawRecord, RecordId};
use quicktasks_proto::task::{Priority, TaskDraft};
use serde_json::{Value, json};

type TestWorkspace = Workspace<MemoryRemote, StaticAuth>;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_workspace(remote: &Arc<MemoryRemote>) -> TestWorkspace {
    Workspace::new(
        Arc::clone(remote),
        StaticAuth::signed_in(Owner::new("alice")),
        WorkspaceOptions::default(),
    )
    .unwrap()
}

/// Opens the feed and applies events until every collection has had one.
async fn make_synced(remote: &Arc<MemoryRemote>) -> (TestWorkspace, ChangeFeed) {
    let mut ws = make_workspace(remote);
    let mut feed = ws.open_feed(16).await;
    while !ws.is_synced() {
        next_event(&mut ws, &mut feed).await;
    }
    (ws, feed)
}

/// Waits for one feed event and applies it.
async fn next_event(ws: &mut TestWorkspace, feed: &mut ChangeFeed) -> StoreSignal {
    let event = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed ended");
    ws.handle_feed_event(event)
}

fn make_task_record(id: &str, uid: &str, title: &str, priority: &str) -> RawRecord {
    let Value::Object(fields) = json!({
        "uid": uid,
        "title": title,
        "status": "Pending",
        "domain": "Work",
        "priority": priority,
        "createdAt": 1_700_000_000_000_i64,
    }) else {
        unreachable!("json object literal");
    };
    RawRecord::new(RecordId::new(id), fields)
}

fn make_draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
        domain: "Work".to_string(),
        priority: Priority::Mid,
        tags: Vec::new(),
        due_date: None,
    }
}

// ===========================================================================
// Initial load
// ===========================================================================

#[tokio::test]
async fn initial_load_fills_every_collection() {
    let remote = Arc::new(MemoryRemote::new());
    remote.insert(Collection::Tasks, make_task_record("t1", "alice", "One", "High"));
    remote.insert(Collection::Tasks, make_task_record("t2", "alice", "Two", "Low"));

    let (ws, _feed) = make_synced(&remote).await;
    for collection in Collection::ALL {
        assert_eq!(ws.store().health(collection), SyncHealth::Live);
    }
    let titles: Vec<&str> = ws.store().tasks().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["One", "Two"]);
    assert_eq!(ws.view().filtered().len(), 2);
}

#[tokio::test]
async fn other_owners_records_never_arrive() {
    let remote = Arc::new(MemoryRemote::new());
    remote.insert(Collection::Tasks, make_task_record("mine", "alice", "Mine", "Mid"));
    remote.insert(Collection::Tasks, make_task_record("theirs", "bob", "Theirs", "Mid"));

    let (ws, _feed) = make_synced(&remote).await;
    assert!(ws.store().task(&RecordId::new("mine")).is_some());
    assert!(ws.store().task(&RecordId::new("theirs")).is_none());
    assert_eq!(ws.store().quarantined(Collection::Tasks), 0);
}

#[tokio::test]
async fn empty_account_shows_no_tasks_state() {
    let remote = Arc::new(MemoryRemote::new());
    let (ws, _feed) = make_synced(&remote).await;
    assert!(ws.store().has_no_tasks());
    assert!(ws.view().board().groups().is_empty());
}

// ===========================================================================
// Live updates
// ===========================================================================

#[tokio::test]
async fn remote_change_arrives_as_one_snapshot() {
    let remote = Arc::new(MemoryRemote::new());
    let (mut ws, mut feed) = make_synced(&remote).await;

    let owner = OwnerId::new("alice");
    let id = remote
        .create(Collection::Tasks, make_draft("From elsewhere").into_fields(&owner))
        .await
        .unwrap();

    let signal = next_event(&mut ws, &mut feed).await;
    assert_eq!(
        signal,
        StoreSignal::Applied {
            collection: Collection::Tasks,
            accepted: 1,
            quarantined: 0,
        }
    );
    assert_eq!(ws.store().task(&id).unwrap().title, "From elsewhere");
    assert!(feed.try_next().is_none());
}

#[tokio::test]
async fn drain_applies_queued_snapshots_without_waiting() {
    let remote = Arc::new(MemoryRemote::new());
    let (mut ws, mut feed) = make_synced(&remote).await;
    assert_eq!(ws.drain(&mut feed), 0);

    let owner = OwnerId::new("alice");
    for title in ["First", "Second"] {
        remote
            .create(Collection::Tasks, make_draft(title).into_fields(&owner))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(ws.drain(&mut feed), 2);
    let titles: Vec<&str> = ws.store().tasks().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["First", "Second"]);
    assert_eq!(ws.view().filtered().len(), 2);
    assert_eq!(ws.drain(&mut feed), 0);
}

#[tokio::test]
async fn remote_delete_removes_task() {
    let remote = Arc::new(MemoryRemote::new());
    remote.insert(Collection::Tasks, make_task_record("t1", "alice", "One", "High"));
    let (mut ws, mut feed) = make_synced(&remote).await;

    remote
        .delete(Collection::Tasks, &RecordId::new("t1"))
        .await
        .unwrap();
    next_event(&mut ws, &mut feed).await;
    assert!(ws.store().has_no_tasks());
}

// ===========================================================================
// Quarantine
// ===========================================================================

#[tokio::test]
async fn malformed_records_are_quarantined() {
    let remote = Arc::new(MemoryRemote::new());
    remote.insert(Collection::Tasks, make_task_record("ok", "alice", "Fine", "High"));
    remote.insert(Collection::Tasks, make_task_record("bad-priority", "alice", "X", "Urgent"));
    remote.insert(Collection::Tasks, make_task_record("no-title", "alice", "  ", "Low"));

    let (ws, _feed) = make_synced(&remote).await;
    let ids: Vec<&RecordId> = ws.store().tasks().map(|t| &t.id).collect();
    assert_eq!(ids, [&RecordId::new("ok")]);
    assert_eq!(ws.store().quarantined(Collection::Tasks), 2);
    assert_eq!(ws.store().health(Collection::Tasks), SyncHealth::Live);
}

#[tokio::test]
async fn fixing_a_record_releases_it_from_quarantine() {
    let remote = Arc::new(MemoryRemote::new());
    remote.insert(Collection::Tasks, make_task_record("t1", "alice", "One", "Urgent"));
    let (mut ws, mut feed) = make_synced(&remote).await;
    assert_eq!(ws.store().quarantined(Collection::Tasks), 1);

    remote.insert(Collection::Tasks, make_task_record("t1", "alice", "One", "High"));
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().quarantined(Collection::Tasks), 0);
    assert_eq!(ws.store().task(&RecordId::new("t1")).unwrap().priority, Priority::High);
}

// ===========================================================================
// Sync health
// ===========================================================================

#[tokio::test]
async fn interruption_degrades_then_recovers() {
    let remote = Arc::new(MemoryRemote::new());
    remote.insert(Collection::Tasks, make_task_record("t1", "alice", "One", "High"));
    let (mut ws, mut feed) = make_synced(&remote).await;

    remote.interrupt(Collection::Tasks, "connection lost");
    let signal = next_event(&mut ws, &mut feed).await;
    assert!(matches!(signal, StoreSignal::SyncDegraded { collection: Collection::Tasks, .. }));
    assert!(ws.store().health(Collection::Tasks).is_degraded());
    assert_eq!(ws.store().health(Collection::Tags), SyncHealth::Live);
    // Last snapshot stays visible.
    assert!(ws.store().task(&RecordId::new("t1")).is_some());
    assert_eq!(ws.view().filtered().len(), 1);

    remote.insert(Collection::Tasks, make_task_record("t2", "alice", "Two", "Low"));
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().health(Collection::Tasks), SyncHealth::Live);
    assert_eq!(ws.store().tasks().len(), 2);
}

#[tokio::test]
async fn closed_subscriptions_degrade_every_collection() {
    let remote = Arc::new(MemoryRemote::new());
    let (mut ws, mut feed) = make_synced(&remote).await;

    remote.close_subscriptions();
    for _ in Collection::ALL {
        let signal = next_event(&mut ws, &mut feed).await;
        assert!(matches!(signal, StoreSignal::SyncDegraded { .. }));
    }
    for collection in Collection::ALL {
        assert!(ws.store().health(collection).is_degraded());
    }
}

#[tokio::test]
async fn subscribe_during_outage_reports_failure() {
    let remote = Arc::new(MemoryRemote::new());
    remote.begin_outage("maintenance");

    let mut ws = make_workspace(&remote);
    let mut feed = ws.open_feed(16).await;
    let mut failed = 0;
    while !ws.is_synced() {
        let event = tokio::time::timeout(Duration::from_secs(2), feed.next())
            .await
            .unwrap()
            .unwrap();
        if let FeedEvent::Failed { error, .. } = &event {
            assert_eq!(*error, RemoteError::Unavailable("maintenance".into()));
            failed += 1;
        }
        ws.handle_feed_event(event);
    }
    assert_eq!(failed, Collection::ALL.len());
    assert!(ws.store().has_no_tasks());
}

// ===========================================================================
// Domains
// ===========================================================================

#[tokio::test]
async fn domain_list_is_defaults_then_custom() {
    let remote = Arc::new(MemoryRemote::new());
    let owner = OwnerId::new("alice");
    for (id, name) in [("d1", "Health"), ("d2", "Work"), ("d3", "Errands"), ("d4", "Health")] {
        remote.insert(
            Collection::Domains,
            RawRecord::new(RecordId::new(id), Domain::new_fields(&owner, name)),
        );
    }

    let (ws, _feed) = make_synced(&remote).await;
    let names: Vec<String> = ws.store().domains().into_iter().map(|d| d.name).collect();
    assert_eq!(names, ["Work", "Admin", "Health", "Errands"]);
    assert!(ws.store().has_domain("Errands"));
    assert!(!ws.store().has_domain("Travel"));
}
