//! Mutation commands.
//!
//! Each command validates against the store, sends at most the requests it
//! needs and returns. The store only changes when the resulting snapshot
//! arrives on the feed. Failures are returned and also queued as a
//! [`Notice`].

use quicktasks_proto::record::{Collection, RecordId};
use quicktasks_proto::tag::TagColor;
use quicktasks_proto::task::{MAX_ACCUMULATED_MINUTES, TaskPatch, TaskStatus};

use super::{Notice, Workspace, WorkspaceError};
use crate::auth::AuthProvider;
use crate::bulk::{self, BulkOperation, BulkReport};
use crate::remote::Remote;
use crate::tasks::{self, CommandError, NewTask, TaskEdit, ValidationError, domains, tags};

impl<R: Remote + 'static, A: AuthProvider> Workspace<R, A> {
    fn notice<T, E: std::fmt::Display>(
        &mut self,
        summary: &'static str,
        result: Result<T, E>,
    ) -> Result<T, E> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{summary}");
            self.notices.push(Notice {
                summary,
                detail: e.to_string(),
            });
        }
        result
    }

    fn require_owner(&self) -> Result<(), ValidationError> {
        self.auth
            .current_owner()
            .map(|_| ())
            .ok_or(ValidationError::NoOwner)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Creates a task. Returns the id the data service assigned.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Validation`] without sending anything, or
    /// [`CommandError::Mutation`] if the service fails the create.
    pub async fn create_task(&mut self, input: NewTask) -> Result<RecordId, CommandError> {
        let result = self.try_create_task(input).await;
        self.notice("Could not add task", result)
    }

    async fn try_create_task(&self, input: NewTask) -> Result<RecordId, CommandError> {
        self.require_owner()?;
        let draft = tasks::prepare_create(&self.store, input, self.options.max_task_title_len)?;
        let id = self
            .remote
            .create(Collection::Tasks, draft.into_fields(&self.owner.id))
            .await?;
        tracing::debug!(task_id = %id, "task created");
        Ok(id)
    }

    /// Flips a task between pending and done. Returns the new status.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an unknown task or a failed update.
    pub async fn toggle_status(&mut self, id: &RecordId) -> Result<TaskStatus, CommandError> {
        let result = self.try_toggle_status(id).await;
        self.notice("Could not update task", result)
    }

    async fn try_toggle_status(&self, id: &RecordId) -> Result<TaskStatus, CommandError> {
        self.require_owner()?;
        let status = self
            .store
            .task(id)
            .ok_or_else(|| ValidationError::UnknownTask(id.clone()))?
            .status
            .toggled();
        self.remote
            .update(Collection::Tasks, id, TaskPatch::status(status).into_patch())
            .await?;
        Ok(status)
    }

    /// Applies `edit` to a task.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on invalid input or a failed update.
    pub async fn edit_task(&mut self, id: &RecordId, edit: TaskEdit) -> Result<(), CommandError> {
        let result = self.try_edit_task(id, edit).await;
        self.notice("Could not update task", result)
    }

    async fn try_edit_task(&self, id: &RecordId, edit: TaskEdit) -> Result<(), CommandError> {
        self.require_owner()?;
        let patch = tasks::prepare_edit(&self.store, id, edit, self.options.max_task_title_len)?;
        self.remote
            .update(Collection::Tasks, id, patch.into_patch())
            .await?;
        Ok(())
    }

    /// Deletes a task and drops its timer.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an unknown task or a failed delete.
    pub async fn delete_task(&mut self, id: &RecordId) -> Result<(), CommandError> {
        let result = self.try_delete_task(id).await;
        if result.is_ok() {
            self.timers.discard(id);
        }
        self.notice("Could not delete task", result)
    }

    async fn try_delete_task(&self, id: &RecordId) -> Result<(), CommandError> {
        self.require_owner()?;
        tasks::require_task(&self.store, id)?;
        self.remote.delete(Collection::Tasks, id).await?;
        Ok(())
    }

    /// Overwrites a task's persisted tracked minutes.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an unknown task, minutes beyond
    /// [`MAX_ACCUMULATED_MINUTES`], or a failed update.
    pub async fn set_accumulated_minutes(
        &mut self,
        id: &RecordId,
        minutes: u64,
    ) -> Result<(), CommandError> {
        let result = self.try_set_minutes(id, minutes).await;
        self.notice("Could not update task", result)
    }

    async fn try_set_minutes(&self, id: &RecordId, minutes: u64) -> Result<(), CommandError> {
        self.require_owner()?;
        tasks::require_task(&self.store, id)?;
        if minutes > MAX_ACCUMULATED_MINUTES {
            return Err(ValidationError::MinutesOutOfRange {
                max: MAX_ACCUMULATED_MINUTES,
            }
            .into());
        }
        self.remote
            .update(
                Collection::Tasks,
                id,
                TaskPatch::accumulated_minutes(minutes).into_patch(),
            )
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk
    // -----------------------------------------------------------------------

    /// Runs `operation` over the selection and leaves bulk mode.
    ///
    /// Returns `None` without sending anything when the selection is empty
    /// or nobody is signed in. A partial failure is reported as a notice.
    pub async fn run_bulk(&mut self, operation: BulkOperation) -> Option<BulkReport> {
        let signed_in = self.require_owner();
        self.notice("Could not update tasks", signed_in).ok()?;
        let report = bulk::run(&*self.remote, operation, &mut self.selection).await?;
        if !report.is_complete() {
            self.notices.push(Notice {
                summary: "Could not update tasks",
                detail: format!("{} of {} requests failed", report.failed(), report.requested),
            });
        }
        Some(report)
    }

    // -----------------------------------------------------------------------
    // Domains
    // -----------------------------------------------------------------------

    /// Adds a custom domain.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an invalid or duplicate name, or a
    /// failed create.
    pub async fn add_domain(&mut self, name: &str) -> Result<RecordId, CommandError> {
        let result = self.try_add_domain(name).await;
        self.notice("Could not add domain", result)
    }

    async fn try_add_domain(&self, name: &str) -> Result<RecordId, CommandError> {
        self.require_owner()?;
        let fields = domains::prepare_add(&self.store, name)?;
        Ok(self.remote.create(Collection::Domains, fields).await?)
    }

    /// Renames a custom domain. Tasks keep the old name.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for a default or unknown domain, an invalid
    /// new name, or a failed update.
    pub async fn rename_domain(&mut self, current: &str, new_name: &str) -> Result<(), CommandError> {
        let result = self.try_rename_domain(current, new_name).await;
        self.notice("Could not rename domain", result)
    }

    async fn try_rename_domain(&self, current: &str, new_name: &str) -> Result<(), CommandError> {
        self.require_owner()?;
        let (id, patch) = domains::prepare_rename(&self.store, current, new_name)?;
        self.remote.update(Collection::Domains, &id, patch).await?;
        Ok(())
    }

    /// Deletes a custom domain. Tasks keep its name.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for a default or unknown domain, or a
    /// failed delete.
    pub async fn delete_domain(&mut self, name: &str) -> Result<(), CommandError> {
        let result = self.try_delete_domain(name).await;
        self.notice("Could not delete domain", result)
    }

    async fn try_delete_domain(&self, name: &str) -> Result<(), CommandError> {
        self.require_owner()?;
        let id = domains::prepare_delete(&self.store, name)?;
        self.remote.delete(Collection::Domains, &id).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------------

    /// Adds a tag.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an invalid or duplicate name, or a
    /// failed create.
    pub async fn add_tag(&mut self, name: &str, color: TagColor) -> Result<RecordId, CommandError> {
        let result = self.try_add_tag(name, color).await;
        self.notice("Could not add tag", result)
    }

    async fn try_add_tag(&self, name: &str, color: TagColor) -> Result<RecordId, CommandError> {
        self.require_owner()?;
        let fields = tags::prepare_add(&self.store, name, color)?;
        Ok(self.remote.create(Collection::Tags, fields).await?)
    }

    /// Renames or recolours a tag.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an unknown tag, a name clash, or a
    /// failed update.
    pub async fn update_tag(&mut self, id: &RecordId, edit: &tags::TagEdit) -> Result<(), CommandError> {
        let result = self.try_update_tag(id, edit).await;
        self.notice("Could not update tag", result)
    }

    async fn try_update_tag(&self, id: &RecordId, edit: &tags::TagEdit) -> Result<(), CommandError> {
        self.require_owner()?;
        let patch = tags::prepare_update(&self.store, id, edit)?;
        if patch.is_empty() {
            return Ok(());
        }
        self.remote.update(Collection::Tags, id, patch).await?;
        Ok(())
    }

    /// Deletes a tag. Tasks keep the dangling id and stop showing a badge
    /// for it.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an unknown tag or a failed delete.
    pub async fn delete_tag(&mut self, id: &RecordId) -> Result<(), CommandError> {
        let result = self.try_delete_tag(id).await;
        self.notice("Could not delete tag", result)
    }

    async fn try_delete_tag(&self, id: &RecordId) -> Result<(), CommandError> {
        self.require_owner()?;
        tags::require_tag(&self.store, id)?;
        self.remote.delete(Collection::Tags, id).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Time tracking
    // -----------------------------------------------------------------------

    /// Starts tracking time on a task from its persisted minutes. A timer
    /// already running for the task restarts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoOwner`] after sign-out, or
    /// [`ValidationError::UnknownTask`].
    pub fn start_timer(&mut self, id: &RecordId) -> Result<(), ValidationError> {
        self.require_owner()?;
        let baseline = self
            .store
            .task(id)
            .ok_or_else(|| ValidationError::UnknownTask(id.clone()))?
            .accumulated_minutes;
        self.timers.start(id, baseline);
        Ok(())
    }

    /// Pauses a task's timer, writing the elapsed minutes. Returns `false`
    /// if the task has no timer.
    pub fn pause_timer(&self, id: &RecordId) -> bool {
        self.timers.pause(id)
    }

    /// Resumes a paused timer. Returns `false` if the task has no timer.
    pub fn resume_timer(&self, id: &RecordId) -> bool {
        self.timers.resume(id)
    }

    /// Zeroes a task's tracked time and writes 0.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] on an unknown task or a failed write.
    pub async fn reset_timer(&mut self, id: &RecordId) -> Result<(), CommandError> {
        let result = self.try_reset_timer(id).await;
        self.notice("Could not reset timer", result)
    }

    async fn try_reset_timer(&self, id: &RecordId) -> Result<(), CommandError> {
        self.require_owner()?;
        tasks::require_task(&self.store, id)?;
        self.timers.reset(id).await.map_err(CommandError::from)
    }

    /// Stops a task's timer, flushing a final write. Returns `false` if the
    /// task had no timer.
    pub async fn stop_timer(&mut self, id: &RecordId) -> bool {
        self.timers.teardown(id).await
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Flushes every timer, leaves bulk mode and signs out.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Auth`] if the provider fails to sign out.
    pub async fn logout(&mut self) -> Result<(), WorkspaceError> {
        self.timers.teardown_all().await;
        self.selection.exit_bulk();
        self.auth.logout().await?;
        tracing::info!(owner = %self.owner.id, "workspace closed");
        Ok(())
    }
}
