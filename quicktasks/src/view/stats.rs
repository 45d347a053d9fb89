//! Dashboard counts, due-date info and tag badges.

use quicktasks_proto::tag::Tag;
use quicktasks_proto::task::{Priority, Task, TaskStatus};
use quicktasks_proto::time::{MILLIS_PER_DAY, Timestamp};

/// Counts over the filtered task set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickStats {
    /// Filtered tasks.
    pub total: usize,
    /// Filtered tasks marked done.
    pub done: usize,
    /// Filtered tasks still pending.
    pub pending: usize,
    /// `done / total` as a rounded percentage, 0 when there are no tasks.
    pub completion_rate: usize,
    /// Task count per domain, in first-seen order.
    pub by_domain: Vec<(String, usize)>,
    /// Task count per priority, in first-seen order.
    pub by_priority: Vec<(Priority, usize)>,
}

impl QuickStats {
    /// Computes the counts for `filtered`.
    #[must_use]
    pub fn compute(filtered: &[&Task]) -> Self {
        let total = filtered.len();
        let done = filtered
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count();

        let mut by_domain: Vec<(String, usize)> = Vec::new();
        let mut by_priority: Vec<(Priority, usize)> = Vec::new();
        for task in filtered {
            match by_domain.iter_mut().find(|(d, _)| *d == task.domain) {
                Some((_, n)) => *n += 1,
                None => by_domain.push((task.domain.clone(), 1)),
            }
            match by_priority.iter_mut().find(|(p, _)| *p == task.priority) {
                Some((_, n)) => *n += 1,
                None => by_priority.push((task.priority, 1)),
            }
        }

        Self {
            total,
            done,
            pending: total - done,
            completion_rate: rounded_percent(done, total),
            by_domain,
            by_priority,
        }
    }
}

/// `part / whole` as a percentage rounded half up.
const fn rounded_percent(part: usize, whole: usize) -> usize {
    if whole == 0 {
        return 0;
    }
    (part * 200 + whole) / (whole * 2)
}

/// Deadline information for a task with a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueInfo {
    /// Whole days until the due instant, rounded up. Negative once past.
    pub days_left: i64,
    /// The due instant has passed by at least a day boundary.
    pub overdue: bool,
    /// Due within the next `due_soon_days` days.
    pub due_soon: bool,
}

impl DueInfo {
    /// Computes the deadline state of `due` as seen at `now`.
    #[must_use]
    pub const fn compute(due: Timestamp, now: Timestamp, due_soon_days: i64) -> Self {
        let diff = due.as_millis().saturating_sub(now.as_millis());
        let mut days_left = diff.div_euclid(MILLIS_PER_DAY);
        if diff.rem_euclid(MILLIS_PER_DAY) > 0 {
            days_left += 1;
        }
        Self {
            days_left,
            overdue: days_left < 0,
            due_soon: days_left >= 0 && days_left <= due_soon_days,
        }
    }
}

/// Badges for `task`: the existing tags it references, in tag order.
///
/// Identifiers of deleted tags produce no badge.
pub fn badges<'a>(task: &Task, tags: impl IntoIterator<Item = &'a Tag>) -> Vec<&'a Tag> {
    tags.into_iter().filter(|tag| task.has_tag(&tag.id)).collect()
}
