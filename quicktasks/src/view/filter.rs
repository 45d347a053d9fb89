//! Filter stage: the conjunction of domain, priority, tag and text predicates.

use std::collections::BTreeSet;

use quicktasks_proto::record::RecordId;
use quicktasks_proto::task::{Priority, Task};

/// Active filter selection.
///
/// Each dimension is inactive when unset or empty. A task passes when it
/// satisfies every active dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Exact domain name.
    pub domain: Option<String>,
    /// Exact priority.
    pub priority: Option<Priority>,
    /// Task must carry at least one of these tags.
    pub tags: BTreeSet<RecordId>,
    /// Case-insensitive substring of title or description.
    pub query: String,
}

/// Which filter dimensions are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ActiveFilters {
    /// Domain filter set.
    pub domain: bool,
    /// Priority filter set.
    pub priority: bool,
    /// At least one tag selected.
    pub tags: bool,
    /// Non-empty search text.
    pub query: bool,
}

impl ActiveFilters {
    /// Returns `true` if any dimension is active.
    #[must_use]
    pub const fn any(self) -> bool {
        self.domain || self.priority || self.tags || self.query
    }

    /// Names of the active dimensions, in a fixed order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        [
            (self.domain, "domain"),
            (self.priority, "priority"),
            (self.tags, "tags"),
            (self.query, "search"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

impl FilterState {
    /// Which dimensions currently constrain the result.
    #[must_use]
    pub fn active(&self) -> ActiveFilters {
        ActiveFilters {
            domain: self.domain.is_some(),
            priority: self.priority.is_some(),
            tags: !self.tags.is_empty(),
            query: !self.query.is_empty(),
        }
    }

    /// Returns `true` if `task` satisfies every active dimension.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.domain.as_ref().is_none_or(|d| *d == task.domain)
            && self.priority.is_none_or(|p| p == task.priority)
            && (self.tags.is_empty() || task.tags.iter().any(|t| self.tags.contains(t)))
            && self.matches_query(task)
    }

    fn matches_query(&self, task: &Task) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }

    /// Retains the tasks that pass, preserving input order.
    pub fn apply<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}
