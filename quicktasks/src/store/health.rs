//! Per-collection sync health and the signals raised by the store.

use std::fmt;

use quicktasks_proto::record::Collection;

/// How fresh the mirror of one collection is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncHealth {
    /// No snapshot received yet.
    #[default]
    Loading,
    /// The latest delivery was a snapshot.
    Live,
    /// The subscription failed; the last good snapshot is still shown.
    Degraded {
        /// Why the subscription failed.
        reason: String,
    },
}

impl SyncHealth {
    /// Returns `true` once at least one delivery has been processed.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    /// Returns `true` while the subscription is failing.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Live => write!(f, "live"),
            Self::Degraded { reason } => write!(f, "degraded ({reason})"),
        }
    }
}

/// Raised after every delivery the store handles. Either kind means the
/// derived views must be recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSignal {
    /// A snapshot replaced the collection.
    Applied {
        /// Replaced collection.
        collection: Collection,
        /// Records that passed validation.
        accepted: usize,
        /// Records kept out of the mirror.
        quarantined: usize,
    },
    /// The subscription failed; the collection keeps its previous contents.
    SyncDegraded {
        /// Affected collection.
        collection: Collection,
        /// Why the subscription failed.
        reason: String,
    },
}

impl StoreSignal {
    /// The collection the signal concerns.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Applied { collection, .. } | Self::SyncDegraded { collection, .. } => *collection,
        }
    }
}
