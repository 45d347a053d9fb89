//! Grouping stage: partitions the filtered tasks into board columns.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use quicktasks_proto::record::RecordId;
use quicktasks_proto::task::{Priority, Task, TaskStatus};

use super::filter::ActiveFilters;

/// Key the board is grouped by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupBy {
    /// Fixed columns `[Pending, Done]`.
    #[default]
    Status,
    /// Fixed columns `[High, Mid, Low]`.
    Priority,
    /// One column per distinct domain among the visible tasks, ascending.
    Domain,
}

impl GroupBy {
    /// Every grouping key.
    pub const ALL: [Self; 3] = [Self::Status, Self::Priority, Self::Domain];

    /// Lower-case name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`GroupBy`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grouping `{0}`, expected status, priority or domain")]
pub struct ParseGroupByError(String);

impl FromStr for GroupBy {
    type Err = ParseGroupByError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseGroupByError(s.to_string()))
    }
}

/// Identifies one board column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Status column.
    Status(TaskStatus),
    /// Priority column.
    Priority(Priority),
    /// Domain column. `known` is `false` when no visible domain has this
    /// name, e.g. after the domain was deleted.
    Domain {
        /// Domain name as stored on the tasks.
        name: String,
        /// Whether the name is a visible domain.
        known: bool,
    },
}

impl GroupKey {
    /// Column heading.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Status(s) => s.as_str(),
            Self::Priority(p) => p.as_str(),
            Self::Domain { name, .. } => name,
        }
    }
}

/// One board column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Column identity.
    pub key: GroupKey,
    /// Tasks in the column, in filtered order.
    pub task_ids: Vec<RecordId>,
}

/// What to show when the filtered set is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyState {
    /// The store holds no tasks at all.
    NoTasks {
        /// Grouping in effect.
        group_by: GroupBy,
    },
    /// Tasks exist but none pass the filter.
    NoMatches {
        /// Grouping in effect.
        group_by: GroupBy,
        /// Dimensions that excluded everything.
        active: ActiveFilters,
    },
}

impl EmptyState {
    /// Guidance text for the presentation layer.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NoTasks {
                group_by: GroupBy::Status,
            } => "No tasks found. Create your first task above!".to_string(),
            Self::NoTasks {
                group_by: GroupBy::Priority,
            } => "No tasks match the current filters. Try adjusting your filters or create a new task."
                .to_string(),
            Self::NoTasks {
                group_by: GroupBy::Domain,
            } => "No tasks found. Add tasks with different domains to see them grouped here."
                .to_string(),
            Self::NoMatches { active, .. } if active.any() => format!(
                "No tasks match the current filters ({}). Try adjusting your filters or create a new task.",
                active.names().join(", ")
            ),
            Self::NoMatches { .. } => {
                "No tasks match the current filters. Try adjusting your filters or create a new task."
                    .to_string()
            }
        }
    }
}

/// The grouped board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardView {
    /// Nothing to show.
    Empty(EmptyState),
    /// Columns in display order.
    Columns(Vec<Group>),
}

impl BoardView {
    /// Columns, or an empty slice for [`BoardView::Empty`].
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        match self {
            Self::Empty(_) => &[],
            Self::Columns(groups) => groups,
        }
    }
}

/// Partitions `filtered` by `group_by`.
///
/// `is_known_domain` tells the domain grouping which names are visible
/// domains. Every filtered task lands in exactly one column.
pub fn group_tasks(
    filtered: &[&Task],
    group_by: GroupBy,
    is_known_domain: impl Fn(&str) -> bool,
) -> Vec<Group> {
    match group_by {
        GroupBy::Status => TaskStatus::BOARD_ORDER
            .into_iter()
            .map(|s| column(filtered, GroupKey::Status(s), |t| t.status == s))
            .collect(),
        GroupBy::Priority => Priority::BOARD_ORDER
            .into_iter()
            .map(|p| column(filtered, GroupKey::Priority(p), |t| t.priority == p))
            .collect(),
        GroupBy::Domain => {
            let names: BTreeSet<&str> = filtered.iter().map(|t| t.domain.as_str()).collect();
            names
                .into_iter()
                .map(|name| {
                    let key = GroupKey::Domain {
                        name: name.to_string(),
                        known: is_known_domain(name),
                    };
                    column(filtered, key, |t| t.domain == name)
                })
                .collect()
        }
    }
}

fn column(filtered: &[&Task], key: GroupKey, pred: impl Fn(&Task) -> bool) -> Group {
    Group {
        key,
        task_ids: filtered
            .iter()
            .filter(|t| pred(t))
            .map(|t| t.id.clone())
            .collect(),
    }
}
