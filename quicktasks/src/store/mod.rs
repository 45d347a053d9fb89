//! Entity store: the local mirror of the owner's tasks, domains and tags.
//!
//! The store is replaced one collection at a time by full snapshots and is
//! the single source every derived view is computed from. It never creates
//! identifiers of its own and is never updated optimistically: the next
//! snapshot is the only way a mutation becomes visible.

pub mod health;

use std::collections::BTreeMap;

use indexmap::IndexMap;
use quicktasks_proto::domain::Domain;
use quicktasks_proto::record::{Collection, OwnerId, RawRecord, RecordId, SchemaError};
use quicktasks_proto::tag::Tag;
use quicktasks_proto::task::Task;

use crate::remote::RemoteError;

pub use health::{StoreSignal, SyncHealth};

/// Validated mirror of one owner's collections.
#[derive(Debug, Clone)]
pub struct EntityStore {
    owner: OwnerId,
    /// Tasks in snapshot arrival order.
    tasks: IndexMap<RecordId, Task>,
    /// Custom domains in snapshot arrival order.
    domains: IndexMap<RecordId, Domain>,
    /// Tags in snapshot arrival order.
    tags: IndexMap<RecordId, Tag>,
    health: BTreeMap<Collection, SyncHealth>,
    quarantined: BTreeMap<Collection, usize>,
}

impl EntityStore {
    /// Creates an empty store for `owner`. Every collection starts
    /// [`SyncHealth::Loading`].
    #[must_use]
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            tasks: IndexMap::new(),
            domains: IndexMap::new(),
            tags: IndexMap::new(),
            health: BTreeMap::new(),
            quarantined: BTreeMap::new(),
        }
    }

    /// Owner every record is validated against.
    #[must_use]
    pub const fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Replaces `collection` with the contents of `records`.
    ///
    /// Records failing validation are quarantined: counted, logged and left
    /// out. When an identifier appears twice the later record wins but keeps
    /// the first one's position. Applying the same snapshot twice yields the
    /// same state.
    pub fn apply_snapshot(&mut self, collection: Collection, records: &[RawRecord]) -> StoreSignal {
        let owner = self.owner.clone();
        let (accepted, quarantined) = match collection {
            Collection::Tasks => replace(&mut self.tasks, collection, records, |r| {
                Task::decode(r, &owner)
            }),
            Collection::Domains => replace(&mut self.domains, collection, records, |r| {
                Domain::decode(r, &owner)
            }),
            Collection::Tags => replace(&mut self.tags, collection, records, |r| {
                Tag::decode(r, &owner)
            }),
        };

        self.health.insert(collection, SyncHealth::Live);
        self.quarantined.insert(collection, quarantined);
        tracing::debug!(%collection, accepted, quarantined, "snapshot applied");

        StoreSignal::Applied {
            collection,
            accepted,
            quarantined,
        }
    }

    /// Records a subscription failure. The collection keeps its contents.
    pub fn mark_degraded(&mut self, collection: Collection, error: &RemoteError) -> StoreSignal {
        let reason = error.to_string();
        tracing::warn!(%collection, error = %error, "sync degraded, keeping last snapshot");
        self.health.insert(
            collection,
            SyncHealth::Degraded {
                reason: reason.clone(),
            },
        );
        StoreSignal::SyncDegraded { collection, reason }
    }

    /// Sync health of `collection`.
    #[must_use]
    pub fn health(&self, collection: Collection) -> SyncHealth {
        self.health.get(&collection).cloned().unwrap_or_default()
    }

    /// Returns `true` once every collection has received a delivery.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        Collection::ALL
            .iter()
            .all(|c| self.health(*c).is_settled())
    }

    /// Records left out of the latest snapshot of `collection`.
    #[must_use]
    pub fn quarantined(&self, collection: Collection) -> usize {
        self.quarantined.get(&collection).copied().unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Tasks in snapshot arrival order.
    pub fn tasks(&self) -> impl ExactSizeIterator<Item = &Task> {
        self.tasks.values()
    }

    /// Looks up a task.
    #[must_use]
    pub fn task(&self, id: &RecordId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Returns `true` if the store has no tasks at all.
    #[must_use]
    pub fn has_no_tasks(&self) -> bool {
        self.tasks.is_empty()
    }

    // -----------------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------------

    /// Tags in snapshot arrival order.
    pub fn tags(&self) -> impl ExactSizeIterator<Item = &Tag> {
        self.tags.values()
    }

    /// Looks up a tag.
    #[must_use]
    pub fn tag(&self, id: &RecordId) -> Option<&Tag> {
        self.tags.get(id)
    }

    /// Finds a tag by exact name.
    #[must_use]
    pub fn tag_named(&self, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.name == name)
    }

    // -----------------------------------------------------------------------
    // Domains
    // -----------------------------------------------------------------------

    /// Visible domains: the defaults, then custom domains in arrival order.
    ///
    /// A custom domain whose name repeats an earlier entry is skipped.
    #[must_use]
    pub fn domains(&self) -> Vec<Domain> {
        let mut visible = Domain::defaults();
        for domain in self.domains.values() {
            if !visible.iter().any(|d| d.name == domain.name) {
                visible.push(domain.clone());
            }
        }
        visible
    }

    /// Returns `true` if `name` is a visible domain.
    #[must_use]
    pub fn has_domain(&self, name: &str) -> bool {
        Domain::is_default_name(name) || self.domains.values().any(|d| d.name == name)
    }

    /// Finds a custom domain by exact name.
    #[must_use]
    pub fn custom_domain(&self, name: &str) -> Option<&Domain> {
        self.domains.values().find(|d| d.name == name)
    }
}

/// Replaces `target` with the records of `snapshot` that decode.
///
/// Returns `(accepted, quarantined)`.
fn replace<T>(
    target: &mut IndexMap<RecordId, T>,
    collection: Collection,
    snapshot: &[RawRecord],
    decode: impl Fn(&RawRecord) -> Result<T, SchemaError>,
) -> (usize, usize) {
    let mut next = IndexMap::with_capacity(snapshot.len());
    let mut quarantined = 0;

    for record in snapshot {
        match decode(record) {
            Ok(value) => {
                next.insert(record.id.clone(), value);
            }
            Err(error) => {
                quarantined += 1;
                tracing::warn!(%collection, record = %record.id, error = %error, "record quarantined");
            }
        }
    }

    *target = next;
    (target.len(), quarantined)
}
