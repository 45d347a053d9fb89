//! Recency stage and relative-time labels for the activity feed.

use quicktasks_proto::task::Task;
use quicktasks_proto::time::Timestamp;

/// Number of entries in the activity feed.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

const MINUTE_MS: i64 = 60 * 1000;

/// The `limit` most recently created tasks, newest first.
///
/// Works on the whole store, ignoring filters and grouping. Ties on the
/// creation instant keep arrival order.
pub fn recent<'a>(tasks: impl IntoIterator<Item = &'a Task>, limit: usize) -> Vec<&'a Task> {
    let mut all: Vec<&Task> = tasks.into_iter().collect();
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    all.truncate(limit);
    all
}

/// Short label for how long ago `then` was, relative to `now`.
///
/// Instants in the future read as "Just now". Anything a week or older is
/// shown as its calendar date.
#[must_use]
pub fn relative_time(then: Timestamp, now: Timestamp) -> String {
    let minutes = now.as_millis().saturating_sub(then.as_millis()).max(0) / MINUTE_MS;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        then.to_calendar_date().unwrap_or_else(|| then.to_string())
    }
}
