//! Change feed: one ordered event channel over the three subscriptions.
//!
//! [`ChangeFeed::open`] subscribes to tasks, domains and tags for one owner
//! and spawns a forwarder task per subscription. Every delivery becomes a
//! [`FeedEvent`] on a single bounded channel, so the consumer sees each
//! collection's snapshots in arrival order and applies them from one place.

use quicktasks_proto::record::{Collection, OwnerId, RawRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::remote::{Remote, RemoteError, SnapshotStream};

/// An event delivered by the change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A complete point-in-time listing of a collection.
    Snapshot {
        /// Collection the snapshot describes.
        collection: Collection,
        /// Every record the owner can see.
        records: Vec<RawRecord>,
    },
    /// The subscription to a collection failed or ended.
    Failed {
        /// Affected collection.
        collection: Collection,
        /// What went wrong.
        error: RemoteError,
    },
}

impl FeedEvent {
    /// The collection this event concerns.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Snapshot { collection, .. } | Self::Failed { collection, .. } => *collection,
        }
    }
}

/// Merged, per-collection ordered stream of [`FeedEvent`]s.
///
/// Dropping the feed stops its forwarder tasks.
pub struct ChangeFeed {
    rx: mpsc::Receiver<FeedEvent>,
    forwarders: Vec<JoinHandle<()>>,
}

impl ChangeFeed {
    /// Subscribes to every collection for `owner`.
    ///
    /// A subscription that cannot be established is reported as a
    /// [`FeedEvent::Failed`] on the feed rather than as an error here, so
    /// the other collections still load.
    pub async fn open<R: Remote>(remote: &R, owner: &OwnerId, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let mut forwarders = Vec::with_capacity(Collection::ALL.len());

        for collection in Collection::ALL {
            let handle = match remote.subscribe(collection, owner).await {
                Ok(stream) => tokio::spawn(forward(collection, stream, tx.clone())),
                Err(error) => {
                    tracing::warn!(%collection, error = %error, "subscribe failed");
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(FeedEvent::Failed { collection, error }).await;
                    })
                }
            };
            forwarders.push(handle);
        }

        Self { rx, forwarders }
    }

    /// Waits for the next event. Returns `None` once every subscription has
    /// ended and all events were consumed.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<FeedEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        for handle in &self.forwarders {
            handle.abort();
        }
    }
}

/// Moves deliveries from one subscription onto the merged channel.
async fn forward(collection: Collection, mut stream: SnapshotStream, tx: mpsc::Sender<FeedEvent>) {
    while let Some(delivery) = stream.next().await {
        let event = match delivery {
            Ok(records) => FeedEvent::Snapshot {
                collection,
                records,
            },
            Err(error) => FeedEvent::Failed { collection, error },
        };
        if tx.send(event).await.is_err() {
            // Feed dropped.
            return;
        }
    }

    tracing::warn!(%collection, "subscription ended");
    let _ = tx
        .send(FeedEvent::Failed {
            collection,
            error: RemoteError::SubscriptionClosed,
        })
        .await;
}
