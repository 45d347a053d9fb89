//! Data service abstraction for `QuickTasks`.
//!
//! Defines the [`Remote`] trait every data collaborator must satisfy.
//! Concrete implementations include:
//! - [`memory::MemoryRemote`]: in-process collaborator for tests and the demo

pub mod memory;

use quicktasks_proto::record::{Collection, OwnerId, Patch, RawRecord, RecordId};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub use memory::MemoryRemote;

/// Errors reported by the data service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service could not be reached or failed internally.
    #[error("data service unavailable: {0}")]
    Unavailable(String),

    /// The addressed record does not exist.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The service refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// A snapshot subscription ended.
    #[error("subscription closed")]
    SubscriptionClosed,
}

/// One delivery on a subscription: a full snapshot, or the reason it failed.
pub type SnapshotResult = Result<Vec<RawRecord>, RemoteError>;

/// Ordered stream of full-collection snapshots for one subscription.
///
/// Ends (yields `None`) when the service drops the subscription.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: mpsc::UnboundedReceiver<SnapshotResult>,
}

impl SnapshotStream {
    /// Creates a connected sender/stream pair.
    #[must_use]
    pub fn channel() -> (mpsc::UnboundedSender<SnapshotResult>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Waits for the next delivery.
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        self.rx.recv().await
    }
}

/// Async data service trait for the three owner-scoped collections.
///
/// The service is the only source of identifiers and creation instants.
/// Snapshots always describe the whole collection as seen by the owner,
/// never a delta.
pub trait Remote: Send + Sync {
    /// Subscribe to `collection` as visible to `owner`.
    ///
    /// The first snapshot is delivered as soon as the subscription is
    /// established, then one after every change.
    fn subscribe(
        &self,
        collection: Collection,
        owner: &OwnerId,
    ) -> impl std::future::Future<Output = Result<SnapshotStream, RemoteError>> + Send;

    /// Create a record and return the identifier the service assigned.
    fn create(
        &self,
        collection: Collection,
        fields: Map<String, Value>,
    ) -> impl std::future::Future<Output = Result<RecordId, RemoteError>> + Send;

    /// Apply a partial update. Fields absent from `patch` are untouched.
    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        patch: Patch,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;

    /// Delete a record.
    fn delete(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;
}
