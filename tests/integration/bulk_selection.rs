//! Integration tests for bulk mode: selection against the filtered view and
//! bulk delete / status changes dispatched to the memory service.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use quicktasks::auth::{Owner, StaticAuth};
use quicktasks::bulk::{BulkOperation, BulkReport};
use quicktasks::feed::ChangeFeed;
use quicktasks::remote::memory::Mutation;
use quicktasks::remote::{MemoryRemote, Remote};
use quicktasks::selection::{SelectionError, SelectionMode};
use quicktasks::tasks::NewTask;
use quicktasks::workspace::{Workspace, WorkspaceOptions};
use quicktasks_proto::record::{Collection, RecordId};
use quicktasks_proto::task::TaskStatus;

type TestWorkspace = Workspace<MemoryRemote, StaticAuth>;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

async fn next_event(ws: &mut TestWorkspace, feed: &mut ChangeFeed) {
    let event = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed ended");
    ws.handle_feed_event(event);
}

async fn apply_events(ws: &mut TestWorkspace, feed: &mut ChangeFeed, count: usize) {
    for _ in 0..count {
        next_event(ws, feed).await;
    }
}

/// Synced workspace with ten tasks: the first three in Work, the rest in
/// Admin. Returns the Work ids.
async fn make_board() -> (Arc<MemoryRemote>, TestWorkspace, ChangeFeed, Vec<RecordId>) {
    let remote = Arc::new(MemoryRemote::new());
    let mut ws = Workspace::new(
        Arc::clone(&remote),
        StaticAuth::signed_in(Owner::new("alice")),
        WorkspaceOptions::default(),
    )
    .unwrap();
    let mut feed = ws.open_feed(32).await;
    while !ws.is_synced() {
        next_event(&mut ws, &mut feed).await;
    }

    let mut work = Vec::new();
    for i in 0..10 {
        let domain = if i < 3 { "Work" } else { "Admin" };
        let id = ws
            .create_task(NewTask {
                title: format!("Task {i}"),
                domain: domain.to_string(),
                ..NewTask::default()
            })
            .await
            .unwrap();
        next_event(&mut ws, &mut feed).await;
        if i < 3 {
            work.push(id);
        }
    }
    (remote, ws, feed, work)
}

fn count_deletes(remote: &MemoryRemote) -> usize {
    remote
        .mutations()
        .iter()
        .filter(|m| matches!(m, Mutation::Delete { .. }))
        .count()
}

// ===========================================================================
// Selection
// ===========================================================================

#[tokio::test]
async fn select_all_respects_filter() {
    let (_remote, mut ws, _feed, work) = make_board().await;
    ws.set_domain_filter(Some("Work".into()));
    ws.enter_bulk();

    assert_eq!(ws.select_all(), Ok(3));
    let selected: Vec<RecordId> = ws.selection().selected().iter().cloned().collect();
    let mut expected = work.clone();
    expected.sort();
    assert_eq!(selected, expected);
    assert!(ws.is_all_selected());
}

#[tokio::test]
async fn toggle_select_all_flips() {
    let (_remote, mut ws, _feed, _work) = make_board().await;
    ws.enter_bulk();
    assert_eq!(ws.toggle_select_all(), Ok(true));
    assert_eq!(ws.selection().len(), 10);
    assert_eq!(ws.toggle_select_all(), Ok(false));
    assert!(ws.selection().is_empty());
}

#[tokio::test]
async fn selecting_requires_bulk_mode() {
    let (_remote, mut ws, _feed, work) = make_board().await;
    assert_eq!(ws.toggle_selected(&work[0]), Err(SelectionError::NotInBulkMode));
    assert_eq!(ws.select_all(), Err(SelectionError::NotInBulkMode));

    assert_eq!(ws.toggle_bulk_mode(), SelectionMode::Bulk);
    assert_eq!(ws.toggle_selected(&work[0]), Ok(true));
    assert_eq!(ws.toggle_selected(&work[0]), Ok(false));

    ws.toggle_selected(&work[1]).unwrap();
    assert_eq!(ws.toggle_bulk_mode(), SelectionMode::Normal);
    assert!(ws.selection().is_empty());
}

#[tokio::test]
async fn narrowing_filter_drops_hidden_selection() {
    let (_remote, mut ws, _feed, work) = make_board().await;
    ws.enter_bulk();
    ws.select_all().unwrap();

    ws.set_domain_filter(Some("Work".into()));
    assert_eq!(ws.selection().len(), 3);

    // Widening again does not bring the dropped ids back.
    ws.set_domain_filter(None);
    assert_eq!(ws.selection().len(), 3);
    assert!(work.iter().all(|id| ws.selection().contains(id)));
}

#[tokio::test]
async fn remote_delete_prunes_selection() {
    let (remote, mut ws, mut feed, work) = make_board().await;
    ws.enter_bulk();
    ws.toggle_selected(&work[0]).unwrap();
    ws.toggle_selected(&work[1]).unwrap();

    remote.delete(Collection::Tasks, &work[0]).await.unwrap();
    next_event(&mut ws, &mut feed).await;

    let selected: Vec<&RecordId> = ws.selection().selected().iter().collect();
    assert_eq!(selected, [&work[1]]);
    assert!(ws.selection().is_bulk());
}

// ===========================================================================
// Bulk operations
// ===========================================================================

#[tokio::test]
async fn bulk_delete_removes_selection() {
    let (remote, mut ws, mut feed, work) = make_board().await;
    ws.set_domain_filter(Some("Work".into()));
    ws.enter_bulk();
    ws.select_all().unwrap();

    let report = ws.run_bulk(BulkOperation::Delete).await.unwrap();
    assert_eq!(
        report,
        BulkReport {
            operation: BulkOperation::Delete,
            requested: 3,
            succeeded: 3,
        }
    );
    assert_eq!(count_deletes(&remote), 3);
    assert_eq!(ws.selection().mode(), SelectionMode::Normal);
    assert!(ws.selection().is_empty());

    apply_events(&mut ws, &mut feed, 3).await;
    assert_eq!(ws.store().tasks().len(), 7);
    assert!(work.iter().all(|id| ws.store().task(id).is_none()));
    assert!(ws.notices().is_empty());
}

#[tokio::test]
async fn bulk_status_marks_every_selected_task() {
    let (_remote, mut ws, mut feed, work) = make_board().await;
    ws.enter_bulk();
    for id in &work {
        ws.toggle_selected(id).unwrap();
    }

    let report = ws
        .run_bulk(BulkOperation::SetStatus(TaskStatus::Done))
        .await
        .unwrap();
    assert!(report.is_complete());
    apply_events(&mut ws, &mut feed, 3).await;

    let done: Vec<&RecordId> = ws
        .store()
        .tasks()
        .filter(|t| t.status == TaskStatus::Done)
        .map(|t| &t.id)
        .collect();
    assert_eq!(done.len(), 3);
    assert!(work.iter().all(|id| done.contains(&id)));
    assert_eq!(ws.view().stats().completion_rate, 30);
}

#[tokio::test]
async fn empty_selection_sends_nothing() {
    let (remote, mut ws, _feed, _work) = make_board().await;
    ws.enter_bulk();
    let before = remote.request_count();

    assert_eq!(ws.run_bulk(BulkOperation::Delete).await, None);
    assert_eq!(remote.request_count(), before);
    assert!(ws.selection().is_bulk());
}

#[tokio::test]
async fn partial_failure_reports_and_exits_bulk() {
    let (remote, mut ws, mut feed, work) = make_board().await;
    remote.fail_writes_to(&work[1]);
    ws.set_domain_filter(Some("Work".into()));
    ws.enter_bulk();
    ws.select_all().unwrap();

    let report = ws.run_bulk(BulkOperation::Delete).await.unwrap();
    assert_eq!(report.requested, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(ws.selection().mode(), SelectionMode::Normal);
    assert!(ws.selection().is_empty());

    let notices = ws.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].summary, "Could not update tasks");
    assert_eq!(notices[0].detail, "1 of 3 requests failed");

    apply_events(&mut ws, &mut feed, 2).await;
    assert_eq!(ws.view().filtered(), [work[1].clone()]);
}

#[tokio::test]
async fn bulk_after_logout_sends_nothing() {
    let (remote, mut ws, _feed, _work) = make_board().await;
    ws.logout().await.unwrap();
    ws.enter_bulk();
    ws.select_all().unwrap();
    let before = remote.request_count();

    assert_eq!(ws.run_bulk(BulkOperation::Delete).await, None);
    assert_eq!(remote.request_count(), before);
    assert_eq!(count_deletes(&remote), 0);

    let notices = ws.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].summary, "Could not update tasks");
    assert_eq!(notices[0].detail, "no signed-in owner");
}
