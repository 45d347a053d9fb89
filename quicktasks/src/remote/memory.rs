//! In-process data service.
//!
//! Keeps every collection in memory, scopes subscriptions by owner and
//! pushes a fresh full snapshot to each matching subscriber after every
//! change. Failures can be injected per record, for the whole service, or
//! on live subscriptions, which is what the tests and the demo binary use
//! it for.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use parking_lot::Mutex;
use quicktasks_proto::record::{Collection, OWNER_FIELD, OwnerId, Patch, RawRecord, RecordId};
use quicktasks_proto::task::fields::CREATED_AT;
use quicktasks_proto::time::Timestamp;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Remote, RemoteError, SnapshotResult, SnapshotStream};

/// A successful mutation, as recorded by [`MemoryRemote::mutations`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A record was created.
    Create {
        /// Target collection.
        collection: Collection,
        /// Identifier assigned to the new record.
        id: RecordId,
    },
    /// A record was patched.
    Update {
        /// Target collection.
        collection: Collection,
        /// Patched record.
        id: RecordId,
        /// The patch as received.
        patch: Patch,
    },
    /// A record was deleted.
    Delete {
        /// Target collection.
        collection: Collection,
        /// Deleted record.
        id: RecordId,
    },
}

struct Subscriber {
    owner: OwnerId,
    tx: mpsc::UnboundedSender<SnapshotResult>,
}

#[derive(Default)]
struct State {
    collections: BTreeMap<Collection, IndexMap<RecordId, Map<String, Value>>>,
    subscribers: BTreeMap<Collection, Vec<Subscriber>>,
    failing: HashSet<RecordId>,
    outage: Option<String>,
    last_created_at: i64,
    requests: usize,
    mutations: Vec<Mutation>,
}

impl State {
    fn snapshot(&self, collection: Collection, owner: &OwnerId) -> Vec<RawRecord> {
        self.collections
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|(_, fields)| {
                fields.get(OWNER_FIELD).and_then(Value::as_str) == Some(owner.as_str())
            })
            .map(|(id, fields)| RawRecord::new(id.clone(), fields.clone()))
            .collect()
    }

    /// Pushes a fresh snapshot to every live subscriber of `collection`.
    fn notify(&mut self, collection: Collection) {
        let Some(mut subscribers) = self.subscribers.remove(&collection) else {
            return;
        };
        subscribers.retain(|sub| {
            let records = self.snapshot(collection, &sub.owner);
            sub.tx.send(Ok(records)).is_ok()
        });
        self.subscribers.insert(collection, subscribers);
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        match &self.outage {
            Some(reason) => Err(RemoteError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn check_writable(&self, id: &RecordId) -> Result<(), RemoteError> {
        self.check_available()?;
        if self.failing.contains(id) {
            return Err(RemoteError::Unavailable(format!("write to {id} failed")));
        }
        Ok(())
    }

    fn next_created_at(&mut self) -> Timestamp {
        let now = Timestamp::now().as_millis().max(self.last_created_at + 1);
        self.last_created_at = now;
        Timestamp::from_millis(now)
    }
}

/// In-memory implementation of [`Remote`].
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` verbatim, bypassing validation and request counting.
    ///
    /// Replaces any record with the same identifier in place. Used to seed
    /// fixtures, including deliberately malformed ones.
    pub fn insert(&self, collection: Collection, record: RawRecord) {
        let mut state = self.state.lock();
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(record.id, record.fields);
        state.notify(collection);
    }

    /// Returns every stored record of `collection`, across all owners.
    #[must_use]
    pub fn records(&self, collection: Collection) -> Vec<RawRecord> {
        let state = self.state.lock();
        state
            .collections
            .get(&collection)
            .into_iter()
            .flatten()
            .map(|(id, fields)| RawRecord::new(id.clone(), fields.clone()))
            .collect()
    }

    /// Returns the stored fields of one record.
    #[must_use]
    pub fn get(&self, collection: Collection, id: &RecordId) -> Option<Map<String, Value>> {
        let state = self.state.lock();
        state.collections.get(&collection)?.get(id).cloned()
    }

    /// Makes every later update or delete of `id` fail.
    pub fn fail_writes_to(&self, id: &RecordId) {
        self.state.lock().failing.insert(id.clone());
    }

    /// Makes every later request fail with [`RemoteError::Unavailable`].
    pub fn begin_outage(&self, reason: &str) {
        self.state.lock().outage = Some(reason.to_string());
    }

    /// Ends an outage started by [`begin_outage`](Self::begin_outage).
    pub fn end_outage(&self) {
        self.state.lock().outage = None;
    }

    /// Delivers an error on every live subscription to `collection`.
    ///
    /// The subscriptions stay open and resume with the next change.
    pub fn interrupt(&self, collection: Collection, reason: &str) {
        let mut state = self.state.lock();
        if let Some(subscribers) = state.subscribers.get_mut(&collection) {
            subscribers.retain(|sub| {
                sub.tx
                    .send(Err(RemoteError::Unavailable(reason.to_string())))
                    .is_ok()
            });
        }
    }

    /// Drops every live subscription, ending their streams.
    pub fn close_subscriptions(&self) {
        self.state.lock().subscribers.clear();
    }

    /// Number of requests received through the [`Remote`] trait.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    /// Successful mutations, in the order they were applied.
    #[must_use]
    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().mutations.clone()
    }
}

impl Remote for MemoryRemote {
    async fn subscribe(
        &self,
        collection: Collection,
        owner: &OwnerId,
    ) -> Result<SnapshotStream, RemoteError> {
        let mut state = self.state.lock();
        state.requests += 1;
        state.check_available()?;

        let (tx, stream) = SnapshotStream::channel();
        let first = state.snapshot(collection, owner);
        // The stream is held locally, so this send cannot fail.
        let _ = tx.send(Ok(first));
        state.subscribers.entry(collection).or_default().push(Subscriber {
            owner: owner.clone(),
            tx,
        });
        tracing::debug!(%collection, %owner, "subscription opened");
        Ok(stream)
    }

    async fn create(
        &self,
        collection: Collection,
        mut fields: Map<String, Value>,
    ) -> Result<RecordId, RemoteError> {
        let mut state = self.state.lock();
        state.requests += 1;
        state.check_available()?;

        let id = RecordId::new(Uuid::now_v7().to_string());
        let created_at = state.next_created_at();
        fields.insert(CREATED_AT.to_string(), created_at.into());
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        state.mutations.push(Mutation::Create {
            collection,
            id: id.clone(),
        });
        state.notify(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        patch: Patch,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.requests += 1;
        state.check_writable(id)?;

        let fields = state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        patch.apply_to(fields);
        state.mutations.push(Mutation::Update {
            collection,
            id: id.clone(),
            patch,
        });
        state.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.requests += 1;
        state.check_writable(id)?;

        state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.shift_remove(id))
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        state.mutations.push(Mutation::Delete {
            collection,
            id: id.clone(),
        });
        state.notify(collection);
        Ok(())
    }
}
