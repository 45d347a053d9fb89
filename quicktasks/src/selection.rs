//! Selection coordinator for bulk operations.
//!
//! Two modes, [`SelectionMode::Normal`] and [`SelectionMode::Bulk`]. Every
//! mode change clears the selection, membership can only change in bulk
//! mode, and [`SelectionCoordinator::prune`] keeps the set inside whatever
//! the filtered view currently shows.

use std::collections::BTreeSet;

use quicktasks_proto::record::RecordId;

/// Whether bulk selection is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Single-task interaction.
    #[default]
    Normal,
    /// Tasks can be selected for a bulk operation.
    Bulk,
}

/// Errors from selection changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// Selection only changes in bulk mode.
    #[error("selection requires bulk mode")]
    NotInBulkMode,

    /// The task is not in the filtered view.
    #[error("task {0} is not visible")]
    NotVisible(RecordId),
}

/// Selected task identifiers plus the current mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCoordinator {
    mode: SelectionMode,
    selected: BTreeSet<RecordId>,
}

impl SelectionCoordinator {
    /// Starts in normal mode with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Returns `true` in bulk mode.
    #[must_use]
    pub fn is_bulk(&self) -> bool {
        self.mode == SelectionMode::Bulk
    }

    /// Selected identifiers, sorted.
    #[must_use]
    pub const fn selected(&self) -> &BTreeSet<RecordId> {
        &self.selected
    }

    /// Number of selected tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Returns `true` if `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    /// Enters bulk mode with an empty selection.
    pub fn enter_bulk(&mut self) {
        self.selected.clear();
        self.mode = SelectionMode::Bulk;
        tracing::debug!("bulk mode entered");
    }

    /// Leaves bulk mode and clears the selection.
    pub fn exit_bulk(&mut self) {
        self.selected.clear();
        self.mode = SelectionMode::Normal;
        tracing::debug!("bulk mode exited");
    }

    /// Switches between the two modes. Returns the new mode.
    pub fn toggle_bulk_mode(&mut self) -> SelectionMode {
        match self.mode {
            SelectionMode::Normal => self.enter_bulk(),
            SelectionMode::Bulk => self.exit_bulk(),
        }
        self.mode
    }

    fn require_bulk(&self) -> Result<(), SelectionError> {
        if self.is_bulk() {
            Ok(())
        } else {
            Err(SelectionError::NotInBulkMode)
        }
    }

    /// Flips membership of `id`. Returns `true` if it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotInBulkMode`] outside bulk mode.
    pub fn toggle(&mut self, id: &RecordId) -> Result<bool, SelectionError> {
        self.require_bulk()?;
        let selected = if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        };
        tracing::debug!(task_id = %id, selected, "selection toggled");
        Ok(selected)
    }

    /// Replaces the selection with exactly the `visible` identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotInBulkMode`] outside bulk mode.
    pub fn select_all(&mut self, visible: &[RecordId]) -> Result<usize, SelectionError> {
        self.require_bulk()?;
        self.selected = visible.iter().cloned().collect();
        tracing::debug!(selected = self.selected.len(), "selected all visible");
        Ok(self.selected.len())
    }

    /// Empties the selection without leaving bulk mode.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Returns `true` if every one of a non-empty `visible` set is selected.
    #[must_use]
    pub fn is_all_selected(&self, visible: &[RecordId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id))
    }

    /// "Select all" / "Deselect all" button: clears the selection when every
    /// visible task is already selected, otherwise selects them all.
    ///
    /// Returns `true` if the visible tasks are now selected.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotInBulkMode`] outside bulk mode.
    pub fn toggle_select_all(&mut self, visible: &[RecordId]) -> Result<bool, SelectionError> {
        self.require_bulk()?;
        if self.is_all_selected(visible) {
            self.selected.clear();
            Ok(false)
        } else {
            self.select_all(visible)?;
            Ok(true)
        }
    }

    /// Drops every selected identifier not in `visible`. Returns how many
    /// were removed.
    pub fn prune(&mut self, visible: &[RecordId]) -> usize {
        if self.selected.is_empty() {
            return 0;
        }
        let keep: BTreeSet<&RecordId> = visible.iter().collect();
        let before = self.selected.len();
        self.selected.retain(|id| keep.contains(id));
        let removed = before - self.selected.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned selection");
        }
        removed
    }

    /// Takes the selected identifiers, leaving the selection empty.
    pub fn take(&mut self) -> Vec<RecordId> {
        std::mem::take(&mut self.selected).into_iter().collect()
    }
}
