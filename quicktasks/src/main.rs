//! `QuickTasks` demo: seeds an in-process data service, syncs the
//! workspace through the change feed and prints the board.
//!
//! ```bash
//! cargo run --bin quicktasks
//!
//! # Filtered, grouped by domain
//! cargo run --bin quicktasks -- --domain Work --priority high --group-by domain
//!
//! # Tag filter and search
//! cargo run --bin quicktasks -- --tag urgent --search report
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use quicktasks::auth::{Owner, StaticAuth};
use quicktasks::config::{CliArgs, ClientConfig};
use quicktasks::remote::{MemoryRemote, Remote, RemoteError};
use quicktasks::timer::format_elapsed;
use quicktasks::view::{BoardView, relative_time};
use quicktasks::workspace::Workspace;
use quicktasks_proto::domain::Domain;
use quicktasks_proto::record::{Collection, OwnerId, RecordId};
use quicktasks_proto::tag::{Tag, TagColor};
use quicktasks_proto::task::{Priority, Task, TaskDraft, TaskPatch, TaskStatus};
use quicktasks_proto::time::{MILLIS_PER_DAY, Timestamp};

type DemoWorkspace = Workspace<MemoryRemote, StaticAuth>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(owner = %config.owner_id, "quicktasks starting");

    let mut owner = Owner::new(config.owner_id.clone());
    if let Some(name) = &config.display_name {
        owner = owner.with_display_name(name.clone());
    }

    let remote = Arc::new(MemoryRemote::new());
    if let Err(e) = seed(&remote, &owner.id).await {
        eprintln!("Error: failed to seed demo data: {e}");
        return ExitCode::FAILURE;
    }

    let mut workspace = match Workspace::new(
        Arc::clone(&remote),
        StaticAuth::signed_in(owner),
        config.workspace_options(),
    ) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut feed = workspace.open_feed(config.feed_buffer).await;
    while !workspace.is_synced() {
        if !workspace.sync_next(&mut feed).await {
            eprintln!("Error: change feed closed before the first sync");
            return ExitCode::FAILURE;
        }
    }

    apply_view_flags(&mut workspace, &cli);

    let now = Timestamp::now();
    println!("Signed in as {}", workspace.owner().label());
    println!();
    print_board(&workspace, now);
    println!();
    print_recent(&workspace, now);
    println!();
    print_stats(&workspace);

    for notice in workspace.take_notices() {
        eprintln!("{notice}");
    }

    if let Err(e) = workspace.logout().await {
        tracing::warn!(error = %e, "logout failed");
    }
    tracing::info!("quicktasks exiting");
    ExitCode::SUCCESS
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("quicktasks.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

// ---------------------------------------------------------------------------
// Demo data
// ---------------------------------------------------------------------------

fn days_from_now(days: i64) -> Timestamp {
    Timestamp::from_millis(Timestamp::now().as_millis() + days * MILLIS_PER_DAY)
}

async fn create_task(
    remote: &MemoryRemote,
    owner: &OwnerId,
    draft: TaskDraft,
) -> Result<RecordId, RemoteError> {
    remote
        .create(Collection::Tasks, draft.into_fields(owner))
        .await
}

async fn seed(remote: &MemoryRemote, owner: &OwnerId) -> Result<(), RemoteError> {
    let urgent = remote
        .create(
            Collection::Tags,
            Tag::new_fields(owner, "urgent", TagColor::Red),
        )
        .await?;
    let home = remote
        .create(
            Collection::Tags,
            Tag::new_fields(owner, "home", TagColor::Green),
        )
        .await?;
    remote
        .create(Collection::Domains, Domain::new_fields(owner, "Health"))
        .await?;

    let draft = |title: &str, domain: &str, priority: Priority| TaskDraft {
        title: title.to_string(),
        description: String::new(),
        domain: domain.to_string(),
        priority,
        tags: Vec::new(),
        due_date: None,
    };

    create_task(
        remote,
        owner,
        TaskDraft {
            description: "Numbers for the quarterly review".to_string(),
            tags: vec![urgent.clone()],
            due_date: Some(days_from_now(1)),
            ..draft("Write report", "Work", Priority::High)
        },
    )
    .await?;
    let expenses = create_task(
        remote,
        owner,
        TaskDraft {
            due_date: Some(days_from_now(-2)),
            ..draft("File expenses", "Admin", Priority::Mid)
        },
    )
    .await?;
    let standup = create_task(remote, owner, draft("Prepare standup", "Work", Priority::Low)).await?;
    create_task(
        remote,
        owner,
        TaskDraft {
            tags: vec![home.clone()],
            ..draft("Book dentist", "Health", Priority::Mid)
        },
    )
    .await?;
    create_task(
        remote,
        owner,
        TaskDraft {
            tags: vec![urgent, home],
            due_date: Some(days_from_now(7)),
            ..draft("Renew passport", "Admin", Priority::High)
        },
    )
    .await?;

    remote
        .update(
            Collection::Tasks,
            &standup,
            TaskPatch::status(TaskStatus::Done).into_patch(),
        )
        .await?;
    remote
        .update(
            Collection::Tasks,
            &expenses,
            TaskPatch::accumulated_minutes(95).into_patch(),
        )
        .await?;

    tracing::info!(records = remote.request_count(), "demo data seeded");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn apply_view_flags(workspace: &mut DemoWorkspace, cli: &CliArgs) {
    if cli.domain.is_some() {
        workspace.set_domain_filter(cli.domain.clone());
    }
    if cli.priority.is_some() {
        workspace.set_priority_filter(cli.priority);
    }
    for name in &cli.tags {
        match workspace.store().tag_named(name).map(|t| t.id.clone()) {
            Some(id) => {
                workspace.toggle_tag_filter(&id);
            }
            None => eprintln!("Warning: unknown tag `{name}`"),
        }
    }
    if let Some(query) = &cli.search {
        workspace.set_query(query.clone());
    }
    if let Some(group_by) = cli.group_by {
        workspace.set_group_by(group_by);
    }
}

fn print_task(workspace: &DemoWorkspace, task: &Task, now: Timestamp) {
    let check = if task.status == TaskStatus::Done { "x" } else { " " };
    let mut line = format!("  [{check}] {} ({}, {})", task.title, task.domain, task.priority);

    for tag in workspace.badges(&task.id) {
        line.push_str(&format!(" #{}", tag.name));
    }
    if let Some(due) = workspace.due_info(&task.id, now) {
        if due.overdue {
            line.push_str(&format!("  overdue by {}d", -due.days_left));
        } else if due.due_soon {
            line.push_str(&format!("  due soon ({}d)", due.days_left));
        } else {
            line.push_str(&format!("  due in {}d", due.days_left));
        }
    }
    if task.accumulated_minutes > 0 {
        line.push_str(&format!(
            "  tracked {}",
            format_elapsed(task.accumulated_minutes * 60)
        ));
    }
    println!("{line}");
}

fn print_board(workspace: &DemoWorkspace, now: Timestamp) {
    println!("Board by {}", workspace.group_by());
    match workspace.view().board() {
        BoardView::Empty(state) => println!("  {}", state.message()),
        BoardView::Columns(groups) => {
            for group in groups {
                println!("== {} ({}) ==", group.key.label(), group.task_ids.len());
                for task in workspace.tasks_for(&group.task_ids) {
                    print_task(workspace, task, now);
                }
            }
        }
    }
}

fn print_recent(workspace: &DemoWorkspace, now: Timestamp) {
    println!("Recent activity");
    for task in workspace.tasks_for(workspace.view().recent()) {
        println!("  {} - {}", task.title, relative_time(task.created_at, now));
    }
}

fn print_stats(workspace: &DemoWorkspace) {
    let stats = workspace.view().stats();
    println!(
        "Quick stats: {} total, {} done, {} pending, {}% complete",
        stats.total, stats.done, stats.pending, stats.completion_rate
    );
    for (domain, count) in &stats.by_domain {
        println!("  {domain}: {count}");
    }
    for (priority, count) in &stats.by_priority {
        println!("  {priority}: {count}");
    }
}
