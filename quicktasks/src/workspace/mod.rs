//! Workspace: the single owner of all client state.
//!
//! Holds the entity store, filter and grouping selection, the selection
//! coordinator, the derived view, running timers and pending notices.
//! Every change to the store or to the filter recomputes the derived view
//! and prunes the selection before the call returns, so readers never see
//! a view that lags the store.

mod commands;

use std::sync::Arc;

use quicktasks_proto::record::{Collection, RecordId};
use quicktasks_proto::tag::Tag;
use quicktasks_proto::task::{Priority, Task};
use quicktasks_proto::time::Timestamp;

use crate::auth::{AuthError, AuthProvider, Owner};
use crate::feed::{ChangeFeed, FeedEvent};
use crate::remote::Remote;
use crate::selection::{SelectionCoordinator, SelectionError, SelectionMode};
use crate::store::{EntityStore, StoreSignal};
use crate::timer::{TimerRegistry, TimerSettings, TimerStatus};
use crate::view::{DEFAULT_RECENT_LIMIT, DerivedView, DueInfo, FilterState, GroupBy, badges};

/// Errors from workspace lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    /// Nobody is signed in.
    #[error("no signed-in owner")]
    NoOwner,

    /// The authentication provider failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Tunables for a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceOptions {
    /// Entries in the activity feed.
    pub recent_limit: usize,
    /// Days ahead a due date counts as "due soon".
    pub due_soon_days: i64,
    /// Maximum task title length, in characters.
    pub max_task_title_len: usize,
    /// Time tracking settings.
    pub timer: TimerSettings,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            recent_limit: DEFAULT_RECENT_LIMIT,
            due_soon_days: 1,
            max_task_title_len: quicktasks_proto::task::MAX_TASK_TITLE_LENGTH,
            timer: TimerSettings::default(),
        }
    }
}

/// A user-visible message about a failed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short headline, e.g. "Could not add task".
    pub summary: &'static str,
    /// The underlying error.
    pub detail: String,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// Client state for one signed-in owner.
pub struct Workspace<R, A> {
    remote: Arc<R>,
    auth: A,
    owner: Owner,
    store: EntityStore,
    filter: FilterState,
    group_by: GroupBy,
    selection: SelectionCoordinator,
    view: DerivedView,
    timers: TimerRegistry<R>,
    notices: Vec<Notice>,
    options: WorkspaceOptions,
}

impl<R: Remote + 'static, A: AuthProvider> Workspace<R, A> {
    /// Creates an empty workspace for the owner currently signed in.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::NoOwner`] if nobody is signed in.
    pub fn new(remote: Arc<R>, auth: A, options: WorkspaceOptions) -> Result<Self, WorkspaceError> {
        let owner = auth.current_owner().ok_or(WorkspaceError::NoOwner)?;
        let store = EntityStore::new(owner.id.clone());
        let filter = FilterState::default();
        let group_by = GroupBy::default();
        let view = DerivedView::compute(&store, &filter, group_by, options.recent_limit);
        let timers = TimerRegistry::new(Arc::clone(&remote), options.timer);

        tracing::info!(owner = %owner.id, "workspace opened");
        Ok(Self {
            remote,
            auth,
            owner,
            store,
            filter,
            group_by,
            selection: SelectionCoordinator::new(),
            view,
            timers,
            notices: Vec::new(),
            options,
        })
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    /// Subscribes to the owner's collections.
    pub async fn open_feed(&self, buffer: usize) -> ChangeFeed {
        ChangeFeed::open(&*self.remote, &self.owner.id, buffer).await
    }

    /// Applies one feed event and recomputes everything derived from it.
    pub fn handle_feed_event(&mut self, event: FeedEvent) -> StoreSignal {
        let signal = match event {
            FeedEvent::Snapshot {
                collection,
                records,
            } => self.store.apply_snapshot(collection, &records),
            FeedEvent::Failed { collection, error } => self.store.mark_degraded(collection, &error),
        };

        if let StoreSignal::Applied { collection, .. } = &signal {
            match collection {
                Collection::Tasks => self.sync_timers(),
                Collection::Tags => self.prune_tag_filter(),
                Collection::Domains => {}
            }
        }
        self.recompute();
        signal
    }

    /// Waits for the next feed event and applies it. Returns `false` once
    /// the feed has ended.
    pub async fn sync_next(&mut self, feed: &mut ChangeFeed) -> bool {
        match feed.next().await {
            Some(event) => {
                self.handle_feed_event(event);
                true
            }
            None => false,
        }
    }

    /// Applies every already-queued feed event. Returns how many.
    pub fn drain(&mut self, feed: &mut ChangeFeed) -> usize {
        let mut applied = 0;
        while let Some(event) = feed.try_next() {
            self.handle_feed_event(event);
            applied += 1;
        }
        applied
    }

    /// Returns `true` once every collection has had a delivery.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.store.is_settled()
    }

    fn recompute(&mut self) {
        self.view = DerivedView::compute(
            &self.store,
            &self.filter,
            self.group_by,
            self.options.recent_limit,
        );
        self.selection.prune(self.view.filtered());
    }

    /// Drops timers of deleted tasks and passes fresh persisted minutes to
    /// paused ones.
    fn sync_timers(&mut self) {
        let tracked: Vec<RecordId> = self.timers.tracked().cloned().collect();
        for id in tracked {
            match self.store.task(&id) {
                Some(task) => {
                    self.timers.rebase(&id, task.accumulated_minutes);
                }
                None => {
                    tracing::debug!(task_id = %id, "task gone, dropping its timer");
                    self.timers.discard(&id);
                }
            }
        }
    }

    fn prune_tag_filter(&mut self) {
        let store = &self.store;
        self.filter.tags.retain(|id| store.tag(id).is_some());
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// The signed-in owner.
    #[must_use]
    pub const fn owner(&self) -> &Owner {
        &self.owner
    }

    /// The entity store.
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The current derived view.
    #[must_use]
    pub const fn view(&self) -> &DerivedView {
        &self.view
    }

    /// The active filter.
    #[must_use]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// The active grouping.
    #[must_use]
    pub const fn group_by(&self) -> GroupBy {
        self.group_by
    }

    /// The selection coordinator.
    #[must_use]
    pub const fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    /// Options the workspace was opened with.
    #[must_use]
    pub const fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    /// Notices not yet taken.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Takes every pending notice.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Resolves ids to tasks, skipping any no longer in the store.
    #[must_use]
    pub fn tasks_for(&self, ids: &[RecordId]) -> Vec<&Task> {
        ids.iter().filter_map(|id| self.store.task(id)).collect()
    }

    /// Tag badges for a task.
    #[must_use]
    pub fn badges(&self, task_id: &RecordId) -> Vec<&Tag> {
        self.store
            .task(task_id)
            .map(|task| badges(task, self.store.tags()))
            .unwrap_or_default()
    }

    /// Deadline info for a task with a due date.
    #[must_use]
    pub fn due_info(&self, task_id: &RecordId, now: Timestamp) -> Option<DueInfo> {
        let due = self.store.task(task_id)?.due_date?;
        Some(DueInfo::compute(due, now, self.options.due_soon_days))
    }

    /// Live status of a task's timer.
    #[must_use]
    pub fn timer_status(&self, task_id: &RecordId) -> Option<TimerStatus> {
        self.timers.status(task_id)
    }

    // -----------------------------------------------------------------------
    // Filter and grouping
    // -----------------------------------------------------------------------

    /// Sets or clears the domain filter.
    pub fn set_domain_filter(&mut self, domain: Option<String>) {
        self.filter.domain = domain;
        self.recompute();
    }

    /// Sets or clears the priority filter.
    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.filter.priority = priority;
        self.recompute();
    }

    /// Adds or removes a tag from the tag filter. Returns `true` if the tag
    /// is now part of the filter. Unknown tags are ignored.
    pub fn toggle_tag_filter(&mut self, tag_id: &RecordId) -> bool {
        let active = if self.filter.tags.remove(tag_id) {
            false
        } else if self.store.tag(tag_id).is_some() {
            self.filter.tags.insert(tag_id.clone());
            true
        } else {
            return false;
        };
        self.recompute();
        active
    }

    /// Sets the free-text query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.recompute();
    }

    /// Clears every filter dimension.
    pub fn clear_filters(&mut self) {
        self.filter = FilterState::default();
        self.recompute();
    }

    /// Changes the board grouping.
    pub fn set_group_by(&mut self, group_by: GroupBy) {
        self.group_by = group_by;
        self.recompute();
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Switches between normal and bulk mode.
    pub fn toggle_bulk_mode(&mut self) -> SelectionMode {
        self.selection.toggle_bulk_mode()
    }

    /// Enters bulk mode with an empty selection.
    pub fn enter_bulk(&mut self) {
        self.selection.enter_bulk();
    }

    /// Leaves bulk mode.
    pub fn exit_bulk(&mut self) {
        self.selection.exit_bulk();
    }

    /// Flips selection of a visible task.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError`] outside bulk mode or for a task the
    /// filter hides.
    pub fn toggle_selected(&mut self, task_id: &RecordId) -> Result<bool, SelectionError> {
        if !self.selection.is_bulk() {
            return Err(SelectionError::NotInBulkMode);
        }
        if !self.view.is_visible(task_id) {
            return Err(SelectionError::NotVisible(task_id.clone()));
        }
        self.selection.toggle(task_id)
    }

    /// Selects exactly the visible tasks.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotInBulkMode`] outside bulk mode.
    pub fn select_all(&mut self) -> Result<usize, SelectionError> {
        self.selection.select_all(self.view.filtered())
    }

    /// "Select all" / "Deselect all".
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotInBulkMode`] outside bulk mode.
    pub fn toggle_select_all(&mut self) -> Result<bool, SelectionError> {
        self.selection.toggle_select_all(self.view.filtered())
    }

    /// Returns `true` if every visible task is selected.
    #[must_use]
    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(self.view.filtered())
    }
}
