//! Bulk mutation engine.
//!
//! Issues one independent request per selected task, all in flight at
//! once, and waits for every one to settle. There is no all-or-nothing
//! guarantee: failures are counted, not retried, and the selection is
//! reset afterwards whatever the outcome.

use std::fmt;

use futures_util::future::join_all;
use quicktasks_proto::record::{Collection, RecordId};
use quicktasks_proto::task::{TaskPatch, TaskStatus};

use crate::remote::{Remote, RemoteError};
use crate::selection::SelectionCoordinator;

/// Operation applied to every selected task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    /// Delete the tasks.
    Delete,
    /// Set every task to the given status.
    SetStatus(TaskStatus),
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::SetStatus(status) => write!(f, "mark {status}"),
        }
    }
}

/// Aggregate outcome of a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkReport {
    /// Operation that ran.
    pub operation: BulkOperation,
    /// Requests issued.
    pub requested: usize,
    /// Requests that succeeded.
    pub succeeded: usize,
}

impl BulkReport {
    /// Requests that failed.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.requested - self.succeeded
    }

    /// Returns `true` if every request succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.succeeded == self.requested
    }
}

/// Applies `operation` to every id concurrently and counts the successes.
pub async fn dispatch<R: Remote>(
    remote: &R,
    operation: BulkOperation,
    ids: &[RecordId],
) -> BulkReport {
    let outcomes = join_all(ids.iter().map(|id| apply(remote, operation, id))).await;

    let mut succeeded = 0;
    for (id, outcome) in ids.iter().zip(outcomes) {
        match outcome {
            Ok(()) => succeeded += 1,
            Err(error) => {
                tracing::warn!(task_id = %id, %operation, error = %error, "bulk request failed");
            }
        }
    }

    BulkReport {
        operation,
        requested: ids.len(),
        succeeded,
    }
}

async fn apply<R: Remote>(
    remote: &R,
    operation: BulkOperation,
    id: &RecordId,
) -> Result<(), RemoteError> {
    match operation {
        BulkOperation::Delete => remote.delete(Collection::Tasks, id).await,
        BulkOperation::SetStatus(status) => {
            remote
                .update(
                    Collection::Tasks,
                    id,
                    TaskPatch::status(status).into_patch(),
                )
                .await
        }
    }
}

/// Runs `operation` over the current selection, then returns to normal
/// mode with an empty selection.
///
/// An empty selection is a no-op: nothing is sent, the mode is kept and
/// `None` is returned.
pub async fn run<R: Remote>(
    remote: &R,
    operation: BulkOperation,
    selection: &mut SelectionCoordinator,
) -> Option<BulkReport> {
    if selection.is_empty() {
        return None;
    }

    let ids = selection.take();
    let report = dispatch(remote, operation, &ids).await;
    selection.exit_bulk();

    tracing::info!(
        %operation,
        requested = report.requested,
        succeeded = report.succeeded,
        "bulk operation finished"
    );
    Some(report)
}
