//! View pipeline: pure derivations over the entity store.
//!
//! [`DerivedView::compute`] runs the filter, grouping, recency and stats
//! stages in one pass and keeps only identifiers, so the result can be held
//! next to the store it was computed from. It is recomputed from scratch on
//! every store, filter or grouping change.

pub mod filter;
pub mod group;
pub mod recent;
pub mod stats;

use std::collections::HashSet;

use quicktasks_proto::record::RecordId;

use crate::store::EntityStore;

pub use filter::{ActiveFilters, FilterState};
pub use group::{BoardView, EmptyState, Group, GroupBy, GroupKey};
pub use recent::{DEFAULT_RECENT_LIMIT, recent, relative_time};
pub use stats::{DueInfo, QuickStats, badges};

/// Everything the presentation layer needs, derived from one store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedView {
    filtered: Vec<RecordId>,
    visible: HashSet<RecordId>,
    board: BoardView,
    recent: Vec<RecordId>,
    stats: QuickStats,
}

impl DerivedView {
    /// Runs every stage against `store`.
    #[must_use]
    pub fn compute(
        store: &EntityStore,
        filter: &FilterState,
        group_by: GroupBy,
        recent_limit: usize,
    ) -> Self {
        let filtered_tasks = filter.apply(store.tasks());

        let board = if filtered_tasks.is_empty() {
            BoardView::Empty(if store.has_no_tasks() {
                EmptyState::NoTasks { group_by }
            } else {
                EmptyState::NoMatches {
                    group_by,
                    active: filter.active(),
                }
            })
        } else {
            BoardView::Columns(group::group_tasks(&filtered_tasks, group_by, |name| {
                store.has_domain(name)
            }))
        };

        let filtered: Vec<RecordId> = filtered_tasks.iter().map(|t| t.id.clone()).collect();
        Self {
            visible: filtered.iter().cloned().collect(),
            stats: QuickStats::compute(&filtered_tasks),
            recent: recent::recent(store.tasks(), recent_limit)
                .into_iter()
                .map(|t| t.id.clone())
                .collect(),
            board,
            filtered,
        }
    }

    /// Identifiers passing the filter, in store order.
    #[must_use]
    pub fn filtered(&self) -> &[RecordId] {
        &self.filtered
    }

    /// Returns `true` if `id` passes the filter.
    #[must_use]
    pub fn is_visible(&self, id: &RecordId) -> bool {
        self.visible.contains(id)
    }

    /// The grouped board.
    #[must_use]
    pub const fn board(&self) -> &BoardView {
        &self.board
    }

    /// Activity feed, newest first, independent of the filter.
    #[must_use]
    pub fn recent(&self) -> &[RecordId] {
        &self.recent
    }

    /// Counts over the filtered set.
    #[must_use]
    pub const fn stats(&self) -> &QuickStats {
        &self.stats
    }
}
