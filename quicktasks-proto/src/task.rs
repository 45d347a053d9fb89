//! Task schema, its validating decoder, and the typed create/update shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{FieldReader, OWNER_FIELD, OwnerId, Patch, RawRecord, RecordId, SchemaError};
use crate::time::Timestamp;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Largest accumulated time, in minutes, whose seconds still fit in a `u64`.
pub const MAX_ACCUMULATED_MINUTES: u64 = u64::MAX / 60;

/// Field names of a task document.
pub mod fields {
    /// Task title.
    pub const TITLE: &str = "title";
    /// Free-form description.
    pub const DESCRIPTION: &str = "description";
    /// `"Pending"` or `"Done"`.
    pub const STATUS: &str = "status";
    /// Domain name.
    pub const DOMAIN: &str = "domain";
    /// `"Low"`, `"Mid"` or `"High"`.
    pub const PRIORITY: &str = "priority";
    /// List of tag identifiers.
    pub const TAGS: &str = "tags";
    /// Optional due instant.
    pub const DUE_DATE: &str = "dueDate";
    /// Creation instant assigned by the data service.
    pub const CREATED_AT: &str = "createdAt";
    /// Accumulated tracked time, whole minutes.
    pub const ACCUMULATED_MINUTES: &str = "actualTimeMinutes";
}

/// Completion status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not finished yet.
    Pending,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Board column order when grouping by status.
    pub const BOARD_ORDER: [Self; 2] = [Self::Pending, Self::Done];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Done" => Some(Self::Done),
            _ => None,
        }
    }

    /// The status a single-click toggle moves to.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default.
    #[default]
    Mid,
    /// Do first.
    High,
}

impl Priority {
    /// Selection order offered when creating or editing a task.
    pub const ALL: [Self; 3] = [Self::Low, Self::Mid, Self::High];

    /// Board column order when grouping by priority.
    pub const BOARD_ORDER: [Self; 3] = [Self::High, Self::Mid, Self::Low];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Mid => "Mid",
            Self::High => "High",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "Low" => Some(Self::Low),
            "Mid" => Some(Self::Mid),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated task mirrored from the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned by the data service.
    pub id: RecordId,
    /// Owning user.
    pub owner: OwnerId,
    /// Non-empty title.
    pub title: String,
    /// Description, possibly empty.
    pub description: String,
    /// Completion status.
    pub status: TaskStatus,
    /// Domain name. May reference a domain that no longer exists.
    pub domain: String,
    /// Priority.
    pub priority: Priority,
    /// Tag identifiers. May include tags that were since deleted.
    pub tags: Vec<RecordId>,
    /// Optional due instant.
    pub due_date: Option<Timestamp>,
    /// Creation instant assigned by the data service.
    pub created_at: Timestamp,
    /// Persisted tracked time in whole minutes.
    pub accumulated_minutes: u64,
}

impl Task {
    /// Decodes and validates a raw task document owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the document is owned by someone else,
    /// lacks a required field, or holds a value outside its schema.
    pub fn decode(record: &RawRecord, owner: &OwnerId) -> Result<Self, SchemaError> {
        let r = FieldReader::new(record);
        Ok(Self {
            id: record.id.clone(),
            owner: r.check_owner(owner)?,
            title: r.non_empty_str(fields::TITLE)?.to_string(),
            description: r
                .optional_str(fields::DESCRIPTION)?
                .unwrap_or_default()
                .to_string(),
            status: r.variant(fields::STATUS, TaskStatus::from_wire)?,
            domain: r.required_str(fields::DOMAIN)?.to_string(),
            priority: r.variant(fields::PRIORITY, Priority::from_wire)?,
            tags: r.id_list(fields::TAGS)?,
            due_date: r.optional_timestamp(fields::DUE_DATE)?,
            created_at: r.required_timestamp(fields::CREATED_AT)?,
            accumulated_minutes: r
                .optional_u64(fields::ACCUMULATED_MINUTES, MAX_ACCUMULATED_MINUTES)?
                .unwrap_or(0),
        })
    }

    /// Returns `true` if the task references `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &RecordId) -> bool {
        self.tags.contains(tag)
    }
}

/// Fields supplied when creating a task.
///
/// Status always starts as [`TaskStatus::Pending`]; the creation instant
/// is assigned by the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title (already trimmed and validated by the caller).
    pub title: String,
    /// Description (already trimmed).
    pub description: String,
    /// Domain name.
    pub domain: String,
    /// Priority.
    pub priority: Priority,
    /// Tag identifiers.
    pub tags: Vec<RecordId>,
    /// Optional due instant.
    pub due_date: Option<Timestamp>,
}

impl TaskDraft {
    /// Builds the document fields to send to the data service.
    #[must_use]
    pub fn into_fields(self, owner: &OwnerId) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(OWNER_FIELD.to_string(), owner.as_str().into());
        map.insert(fields::TITLE.to_string(), self.title.into());
        map.insert(fields::DESCRIPTION.to_string(), self.description.into());
        map.insert(fields::STATUS.to_string(), TaskStatus::Pending.as_str().into());
        map.insert(fields::DOMAIN.to_string(), self.domain.into());
        map.insert(fields::PRIORITY.to_string(), self.priority.as_str().into());
        map.insert(fields::TAGS.to_string(), tag_list(&self.tags));
        if let Some(due) = self.due_date {
            map.insert(fields::DUE_DATE.to_string(), due.into());
        }
        map
    }
}

/// How an optional field should change in an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value alone.
    #[default]
    Keep,
    /// Store a new value.
    Set(T),
    /// Remove the stored value.
    Clear,
}

/// A partial task update. `None` / [`FieldUpdate::Keep`] leave a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// New domain name.
    pub domain: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
    /// Replacement tag list.
    pub tags: Option<Vec<RecordId>>,
    /// Due date change, including explicit removal.
    pub due_date: FieldUpdate<Timestamp>,
    /// New persisted tracked time.
    pub accumulated_minutes: Option<u64>,
}

impl TaskPatch {
    /// A patch that only changes the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A patch that only changes the persisted tracked time.
    #[must_use]
    pub fn accumulated_minutes(minutes: u64) -> Self {
        Self {
            accumulated_minutes: Some(minutes),
            ..Self::default()
        }
    }

    /// Converts to the untyped patch sent to the data service.
    #[must_use]
    pub fn into_patch(self) -> Patch {
        let mut patch = Patch::new();
        if let Some(title) = self.title {
            patch = patch.set(fields::TITLE, title);
        }
        if let Some(description) = self.description {
            patch = patch.set(fields::DESCRIPTION, description);
        }
        if let Some(status) = self.status {
            patch = patch.set(fields::STATUS, status.as_str());
        }
        if let Some(domain) = self.domain {
            patch = patch.set(fields::DOMAIN, domain);
        }
        if let Some(priority) = self.priority {
            patch = patch.set(fields::PRIORITY, priority.as_str());
        }
        if let Some(tags) = self.tags {
            patch = patch.set(fields::TAGS, tag_list(&tags));
        }
        match self.due_date {
            FieldUpdate::Keep => {}
            FieldUpdate::Set(due) => patch = patch.set(fields::DUE_DATE, due),
            FieldUpdate::Clear => patch = patch.clear(fields::DUE_DATE),
        }
        if let Some(minutes) = self.accumulated_minutes {
            patch = patch.set(fields::ACCUMULATED_MINUTES, minutes);
        }
        patch
    }
}

fn tag_list(tags: &[RecordId]) -> Value {
    Value::Array(tags.iter().map(|t| Value::from(t.as_str())).collect())
}
