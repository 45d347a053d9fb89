//! Integration tests for task, domain and tag commands.
//!
//! Every command goes through the workspace against the in-process memory
//! service; its effect is observed only after the resulting snapshot comes
//! back through the change feed.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use quicktasks::auth::{Owner, StaticAuth};
use quicktasks::feed::ChangeFeed;
use quicktasks::remote::{MemoryRemote, RemoteError};
use quicktasks::store::StoreSignal;
use quicktasks::tasks::tags::TagEdit;
use quicktasks::tasks::{CommandError, NewTask, TaskEdit, ValidationError};
use quicktasks::view::{GroupBy, GroupKey};
use quicktasks::workspace::{Workspace, WorkspaceOptions};
use quicktasks_proto::record::RecordId;
use quicktasks_proto::tag::TagColor;
use quicktasks_proto::task::{FieldUpdate, Priority, TaskStatus};
use quicktasks_proto::time::{MILLIS_PER_DAY, Timestamp};

type TestWorkspace = Workspace<MemoryRemote, StaticAuth>;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

async fn make_synced_with(options: WorkspaceOptions) -> (Arc<MemoryRemote>, TestWorkspace, ChangeFeed) {
    let remote = Arc::new(MemoryRemote::new());
    let mut ws = Workspace::new(
        Arc::clone(&remote),
        StaticAuth::signed_in(Owner::new("alice").with_display_name("Alice")),
        options,
    )
    .unwrap();
    let mut feed = ws.open_feed(16).await;
    while !ws.is_synced() {
        next_event(&mut ws, &mut feed).await;
    }
    (remote, ws, feed)
}

async fn make_synced() -> (Arc<MemoryRemote>, TestWorkspace, ChangeFeed) {
    make_synced_with(WorkspaceOptions::default()).await
}

/// Waits for one feed event and applies it.
async fn next_event(ws: &mut TestWorkspace, feed: &mut ChangeFeed) -> StoreSignal {
    let event = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed ended");
    ws.handle_feed_event(event)
}

fn make_new_task(title: &str, domain: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        domain: domain.to_string(),
        ..NewTask::default()
    }
}

/// Creates a task and waits for it to land in the store.
async fn create_synced(ws: &mut TestWorkspace, feed: &mut ChangeFeed, input: NewTask) -> RecordId {
    let id = ws.create_task(input).await.unwrap();
    next_event(ws, feed).await;
    assert!(ws.store().task(&id).is_some());
    id
}

// ===========================================================================
// Tasks
// ===========================================================================

#[tokio::test]
async fn create_trims_and_defaults() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(
        &mut ws,
        &mut feed,
        NewTask {
            title: "  Write report  ".to_string(),
            description: "  quarterly  ".to_string(),
            domain: "Work".to_string(),
            due_date: Some("2030-01-15".to_string()),
            ..NewTask::default()
        },
    )
    .await;

    let task = ws.store().task(&id).unwrap();
    assert_eq!(task.title, "Write report");
    assert_eq!(task.description, "quarterly");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, Priority::Mid);
    assert_eq!(task.accumulated_minutes, 0);
    assert_eq!(task.due_date, Some(Timestamp::from_calendar_date("2030-01-15").unwrap()));
}

#[tokio::test]
async fn invalid_inputs_send_nothing() {
    let options = WorkspaceOptions {
        max_task_title_len: 10,
        ..WorkspaceOptions::default()
    };
    let (remote, mut ws, _feed) = make_synced_with(options).await;
    let before = remote.request_count();

    let cases = [
        (make_new_task("   ", "Work"), ValidationError::TitleEmpty),
        (
            make_new_task("a title that is too long", "Work"),
            ValidationError::TitleTooLong { max: 10 },
        ),
        (
            make_new_task("Task", "Nowhere"),
            ValidationError::UnknownDomain("Nowhere".into()),
        ),
        (
            NewTask {
                tags: vec![RecordId::new("ghost")],
                ..make_new_task("Task", "Work")
            },
            ValidationError::UnknownTag(RecordId::new("ghost")),
        ),
    ];
    for (input, expected) in cases {
        assert_eq!(
            ws.create_task(input).await,
            Err(CommandError::Validation(expected))
        );
    }

    let bad_date = NewTask {
        due_date: Some("2030-13-01".into()),
        ..make_new_task("Task", "Work")
    };
    assert!(matches!(
        ws.create_task(bad_date).await,
        Err(CommandError::Validation(ValidationError::InvalidDate(_)))
    ));

    assert_eq!(remote.request_count(), before);
    let notices = ws.take_notices();
    assert_eq!(notices.len(), 5);
    assert!(notices.iter().all(|n| n.summary == "Could not add task"));
}

#[tokio::test]
async fn toggle_status_round_trips() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(&mut ws, &mut feed, make_new_task("Call", "Admin")).await;

    assert_eq!(ws.toggle_status(&id).await, Ok(TaskStatus::Done));
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().task(&id).unwrap().status, TaskStatus::Done);

    assert_eq!(ws.toggle_status(&id).await, Ok(TaskStatus::Pending));
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().task(&id).unwrap().status, TaskStatus::Pending);
}

#[tokio::test]
async fn edit_sets_and_clears_due_date() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(&mut ws, &mut feed, make_new_task("Plan", "Work")).await;

    ws.edit_task(
        &id,
        TaskEdit {
            title: Some("Plan trip".into()),
            priority: Some(Priority::High),
            due_date: FieldUpdate::Set("2030-06-01".into()),
            ..TaskEdit::default()
        },
    )
    .await
    .unwrap();
    next_event(&mut ws, &mut feed).await;
    let task = ws.store().task(&id).unwrap();
    assert_eq!(task.title, "Plan trip");
    assert_eq!(task.priority, Priority::High);
    assert!(task.due_date.is_some());

    ws.edit_task(
        &id,
        TaskEdit {
            due_date: FieldUpdate::Clear,
            ..TaskEdit::default()
        },
    )
    .await
    .unwrap();
    next_event(&mut ws, &mut feed).await;
    let task = ws.store().task(&id).unwrap();
    assert_eq!(task.due_date, None);
    assert_eq!(task.title, "Plan trip");
}

#[tokio::test]
async fn delete_removes_task() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(&mut ws, &mut feed, make_new_task("Temp", "Work")).await;

    ws.delete_task(&id).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert!(ws.store().task(&id).is_none());
    assert!(ws.store().has_no_tasks());

    assert_eq!(
        ws.delete_task(&id).await,
        Err(CommandError::Validation(ValidationError::UnknownTask(id.clone())))
    );
    assert_eq!(ws.take_notices()[0].summary, "Could not delete task");
}

#[tokio::test]
async fn failed_mutation_surfaces_notice() {
    let (remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(&mut ws, &mut feed, make_new_task("Sticky", "Work")).await;
    remote.fail_writes_to(&id);

    let result = ws.delete_task(&id).await;
    assert!(matches!(result, Err(CommandError::Mutation(RemoteError::Unavailable(_)))));
    let notices = ws.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].summary, "Could not delete task");
    assert!(ws.store().task(&id).is_some());
}

#[tokio::test]
async fn accumulated_minutes_can_be_set() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(&mut ws, &mut feed, make_new_task("Focus", "Work")).await;

    ws.set_accumulated_minutes(&id, 42).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().task(&id).unwrap().accumulated_minutes, 42);
}

// ===========================================================================
// Derived views through commands
// ===========================================================================

#[tokio::test]
async fn recent_activity_is_newest_five() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let mut ids = Vec::new();
    for i in 1..=6 {
        ids.push(create_synced(&mut ws, &mut feed, make_new_task(&format!("T{i}"), "Work")).await);
    }

    let recent: Vec<&str> = ws
        .tasks_for(ws.view().recent())
        .into_iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(recent, ["T6", "T5", "T4", "T3", "T2"]);
}

#[tokio::test]
async fn domain_filter_excludes_other_domains() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let work = create_synced(&mut ws, &mut feed, make_new_task("Report", "Work")).await;
    create_synced(&mut ws, &mut feed, make_new_task("Taxes", "Admin")).await;

    ws.set_domain_filter(Some("Work".into()));
    assert_eq!(ws.view().filtered(), [work]);
    assert_eq!(ws.view().stats().total, 1);
    assert_eq!(ws.view().stats().by_domain, [("Work".to_string(), 1)]);
}

#[tokio::test]
async fn due_info_reports_overdue_tasks() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let id = create_synced(
        &mut ws,
        &mut feed,
        NewTask {
            due_date: Some("2030-01-10".into()),
            ..make_new_task("Deadline", "Work")
        },
    )
    .await;

    let due = Timestamp::from_calendar_date("2030-01-10").unwrap();
    let two_days_later = Timestamp::from_millis(due.as_millis() + 2 * MILLIS_PER_DAY);
    let info = ws.due_info(&id, two_days_later).unwrap();
    assert!(info.overdue);
    assert_eq!(info.days_left, -2);

    let half_day_before = Timestamp::from_millis(due.as_millis() - MILLIS_PER_DAY / 2);
    let info = ws.due_info(&id, half_day_before).unwrap();
    assert!(!info.overdue);
    assert!(info.due_soon);
    assert_eq!(info.days_left, 1);
}

// ===========================================================================
// Domains
// ===========================================================================

#[tokio::test]
async fn custom_domain_lifecycle() {
    let (remote, mut ws, mut feed) = make_synced().await;

    ws.add_domain("  Health ").await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert!(ws.store().has_domain("Health"));

    let id = create_synced(&mut ws, &mut feed, make_new_task("Run", "Health")).await;

    ws.rename_domain("Health", "Fitness").await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert!(ws.store().has_domain("Fitness"));
    assert!(!ws.store().has_domain("Health"));
    // Tasks keep the old name and show under an unknown column.
    assert_eq!(ws.store().task(&id).unwrap().domain, "Health");
    ws.set_group_by(GroupBy::Domain);
    let keys: Vec<&GroupKey> = ws.view().board().groups().iter().map(|g| &g.key).collect();
    assert_eq!(
        keys,
        [&GroupKey::Domain {
            name: "Health".into(),
            known: false
        }]
    );

    ws.delete_domain("Fitness").await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert!(!ws.store().has_domain("Fitness"));

    let before = remote.request_count();
    assert_eq!(
        ws.add_domain("Work").await,
        Err(CommandError::Validation(ValidationError::DomainExists("Work".into())))
    );
    assert_eq!(
        ws.delete_domain("Admin").await,
        Err(CommandError::Validation(ValidationError::DefaultDomainImmutable(
            "Admin".into()
        )))
    );
    assert_eq!(remote.request_count(), before);
}

// ===========================================================================
// Tags
// ===========================================================================

#[tokio::test]
async fn tag_update_and_delete() {
    let (remote, mut ws, mut feed) = make_synced().await;
    let urgent = ws.add_tag("urgent", TagColor::Red).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    let home = ws.add_tag("home", TagColor::default()).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().tag(&home).unwrap().color, TagColor::Blue);

    let id = create_synced(
        &mut ws,
        &mut feed,
        NewTask {
            tags: vec![home.clone(), urgent.clone()],
            ..make_new_task("Fix sink", "Admin")
        },
    )
    .await;
    // Badges follow tag collection order.
    let badges: Vec<&str> = ws.badges(&id).into_iter().map(|t| t.name.as_str()).collect();
    assert_eq!(badges, ["urgent", "home"]);

    ws.update_tag(
        &urgent,
        &TagEdit {
            name: None,
            color: Some(TagColor::Amber),
        },
    )
    .await
    .unwrap();
    next_event(&mut ws, &mut feed).await;
    assert_eq!(ws.store().tag(&urgent).unwrap().color, TagColor::Amber);

    let before = remote.request_count();
    let clash = TagEdit {
        name: Some("home".into()),
        color: None,
    };
    assert_eq!(
        ws.update_tag(&urgent, &clash).await,
        Err(CommandError::Validation(ValidationError::TagExists("home".into())))
    );
    assert_eq!(remote.request_count(), before);

    assert!(ws.toggle_tag_filter(&urgent));
    assert_eq!(ws.view().filtered(), [id.clone()]);

    ws.delete_tag(&urgent).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    // The task keeps the dangling id, the badge and the filter entry go.
    assert!(ws.store().task(&id).unwrap().has_tag(&urgent));
    let badges: Vec<&str> = ws.badges(&id).into_iter().map(|t| t.name.as_str()).collect();
    assert_eq!(badges, ["home"]);
    assert!(ws.filter().tags.is_empty());
    assert_eq!(ws.view().filtered(), [id]);
}

#[tokio::test]
async fn deleted_only_tag_leaves_no_badges() {
    let (_remote, mut ws, mut feed) = make_synced().await;
    let tag = ws.add_tag("solo", TagColor::Pink).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    let id = create_synced(
        &mut ws,
        &mut feed,
        NewTask {
            tags: vec![tag.clone()],
            ..make_new_task("Tagged", "Work")
        },
    )
    .await;
    assert_eq!(ws.badges(&id).len(), 1);

    ws.delete_tag(&tag).await.unwrap();
    next_event(&mut ws, &mut feed).await;
    assert!(ws.badges(&id).is_empty());
}

#[tokio::test]
async fn owner_label_prefers_display_name() {
    let (_remote, ws, _feed) = make_synced().await;
    assert_eq!(ws.owner().label(), "Alice");
    assert_eq!(ws.store().owner().as_str(), "alice");
}
