//! Local validation for task, domain and tag commands.
//!
//! Every function here checks its input against the current store and
//! turns it into the exact create fields or patch to send. Nothing here
//! talks to the data service, so a [`ValidationError`] always means no
//! request was made.

pub mod domains;
pub mod tags;

use quicktasks_proto::record::RecordId;
use quicktasks_proto::task::{FieldUpdate, Priority, TaskDraft, TaskPatch};
use quicktasks_proto::time::{DateError, Timestamp};
use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::EntityStore;

/// A command input that failed a local precondition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Task title is empty after trimming.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the configured maximum.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Configured maximum, in characters.
        max: usize,
    },
    /// Nobody is signed in.
    #[error("no signed-in owner")]
    NoOwner,
    /// The task does not exist in the store.
    #[error("unknown task {0}")]
    UnknownTask(RecordId),
    /// The domain is not visible to the owner.
    #[error("unknown domain `{0}`")]
    UnknownDomain(String),
    /// The tag does not exist.
    #[error("unknown tag {0}")]
    UnknownTag(RecordId),
    /// Domain name is empty after trimming.
    #[error("domain name cannot be empty")]
    DomainNameEmpty,
    /// A visible domain already has that name.
    #[error("domain `{0}` already exists")]
    DomainExists(String),
    /// Default domains cannot be renamed or deleted.
    #[error("`{0}` is a default domain and cannot be changed")]
    DefaultDomainImmutable(String),
    /// Tag name is empty after trimming.
    #[error("tag name cannot be empty")]
    TagNameEmpty,
    /// Another tag already has that name.
    #[error("tag `{0}` already exists")]
    TagExists(String),
    /// Tracked minutes beyond what the timer can count in seconds.
    #[error("tracked time too large (max {max} minutes)")]
    MinutesOutOfRange {
        /// Largest accepted value.
        max: u64,
    },
    /// The due date is not a valid calendar date.
    #[error(transparent)]
    InvalidDate(#[from] DateError),
}

/// Errors from commands that reach the data service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The data service refused or failed the request.
    #[error(transparent)]
    Mutation(#[from] RemoteError),
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Title, trimmed before validation.
    pub title: String,
    /// Description, trimmed.
    pub description: String,
    /// Domain name. Must be visible.
    pub domain: String,
    /// Priority.
    pub priority: Priority,
    /// Tag ids. Each must exist.
    pub tags: Vec<RecordId>,
    /// Due date as `YYYY-MM-DD`, if any.
    pub due_date: Option<String>,
}

/// Changes to an existing task. `None` / [`FieldUpdate::Keep`] leave a
/// field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    /// New title, trimmed before validation.
    pub title: Option<String>,
    /// New description, trimmed.
    pub description: Option<String>,
    /// New domain name. Must be visible.
    pub domain: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
    /// Replacement tag ids. Each must exist.
    pub tags: Option<Vec<RecordId>>,
    /// Due date change, as `YYYY-MM-DD`.
    pub due_date: FieldUpdate<String>,
}

/// Trims and checks a task title.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] or
/// [`ValidationError::TitleTooLong`].
pub fn validate_title(title: &str, max_len: usize) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > max_len {
        return Err(ValidationError::TitleTooLong { max: max_len });
    }
    Ok(title.to_string())
}

fn check_domain(store: &EntityStore, domain: &str) -> Result<(), ValidationError> {
    if store.has_domain(domain) {
        Ok(())
    } else {
        Err(ValidationError::UnknownDomain(domain.to_string()))
    }
}

fn check_tags(store: &EntityStore, tags: &[RecordId]) -> Result<(), ValidationError> {
    match tags.iter().find(|id| store.tag(id).is_none()) {
        Some(missing) => Err(ValidationError::UnknownTag(missing.clone())),
        None => Ok(()),
    }
}

/// Deduplicates tag ids, keeping first occurrences.
fn dedup_tags(tags: Vec<RecordId>) -> Vec<RecordId> {
    let mut out: Vec<RecordId> = Vec::with_capacity(tags.len());
    for id in tags {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Validates `input` into the draft to create.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn prepare_create(
    store: &EntityStore,
    input: NewTask,
    max_title_len: usize,
) -> Result<TaskDraft, ValidationError> {
    let title = validate_title(&input.title, max_title_len)?;
    check_domain(store, &input.domain)?;
    let tags = dedup_tags(input.tags);
    check_tags(store, &tags)?;
    let due_date = input
        .due_date
        .as_deref()
        .map(Timestamp::from_calendar_date)
        .transpose()?;

    Ok(TaskDraft {
        title,
        description: input.description.trim().to_string(),
        domain: input.domain,
        priority: input.priority,
        tags,
        due_date,
    })
}

/// Validates `edit` of task `id` into the patch to send.
///
/// Only fields named in `edit` end up in the patch, so a task whose stored
/// domain has since disappeared keeps it unless the edit changes it.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn prepare_edit(
    store: &EntityStore,
    id: &RecordId,
    edit: TaskEdit,
    max_title_len: usize,
) -> Result<TaskPatch, ValidationError> {
    if store.task(id).is_none() {
        return Err(ValidationError::UnknownTask(id.clone()));
    }

    let title = edit
        .title
        .map(|t| validate_title(&t, max_title_len))
        .transpose()?;
    if let Some(domain) = &edit.domain {
        check_domain(store, domain)?;
    }
    let tags = edit.tags.map(dedup_tags);
    if let Some(tags) = &tags {
        check_tags(store, tags)?;
    }
    let due_date = match edit.due_date {
        FieldUpdate::Keep => FieldUpdate::Keep,
        FieldUpdate::Clear => FieldUpdate::Clear,
        FieldUpdate::Set(date) if date.trim().is_empty() => FieldUpdate::Clear,
        FieldUpdate::Set(date) => FieldUpdate::Set(Timestamp::from_calendar_date(&date)?),
    };

    Ok(TaskPatch {
        title,
        description: edit.description.map(|d| d.trim().to_string()),
        status: None,
        domain: edit.domain,
        priority: edit.priority,
        tags,
        due_date,
        accumulated_minutes: None,
    })
}

/// Checks that task `id` exists.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownTask`].
pub fn require_task(store: &EntityStore, id: &RecordId) -> Result<(), ValidationError> {
    store
        .task(id)
        .map(|_| ())
        .ok_or_else(|| ValidationError::UnknownTask(id.clone()))
}
