//! Optimistic mutation protocol.
//!
//! Every mutation follows the same lifecycle: validate, apply locally,
//! persist asynchronously, then confirm or roll back. The local board is
//! updated (and can be re-rendered) before the store round-trip; the
//! round-trip's result resolves the pending state:
//!
//! - success: adopt the store-returned versions, nothing else changes;
//! - version conflict: restore the exact pre-mutation field values and
//!   latch the session stale — every further mutation is refused until
//!   [`Session::reload`] succeeds (no automatic merge of conflicting
//!   edits);
//! - any other failure: restore the pre-mutation values and surface a
//!   typed error; the board is never left corrupted.
//!
//! Mutations on one session are serialized by construction: every method
//! takes `&mut self`, so a second action must await the in-flight one.

use std::time::{SystemTime, UNIX_EPOCH};

use taskdesk_proto::store::PriorityChange;
use taskdesk_proto::task::{
    RowId, SENTINEL_PRIORITY, Task, TaskDraft, TaskEdit, TaskKey, TaskStatus, ValidationError,
};

use crate::notify::Notifier;
use crate::reconcile::{self, ReconcileError};
use crate::session::Session;
use crate::store::{RowStore, StoreError};

/// Errors surfaced by the mutation protocol.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Another writer updated a row first; the board must be reloaded.
    #[error(
        "row {row} was changed by another user (expected version {expected}, found {actual}); \
         reload required"
    )]
    Conflict {
        /// Row whose version no longer matched.
        row: RowId,
        /// Version this client expected.
        expected: u64,
        /// Version found in the store.
        actual: u64,
    },
    /// The session is stale after a conflict; reload before editing again.
    #[error("session is stale after a conflict; reload before further edits")]
    StaleSession,
    /// The input was rejected before any local mutation or store call.
    #[error("validation failed: {0}")]
    Rejected(#[from] ValidationError),
    /// A reconciliation precondition failed; nothing was mutated.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// The target row no longer exists in the store.
    #[error("task not found in the store: row {0}")]
    NotFound(RowId),
    /// A task is still awaiting store confirmation and cannot be mutated.
    #[error("task {0} has not been persisted yet")]
    Unpersisted(TaskKey),
    /// The store call did not complete within the configured timeout.
    #[error("store request timed out")]
    Timeout,
    /// The store could not be reached or failed mid-call.
    #[error("could not reach the task store: {0}")]
    Transport(String),
}

/// Current time in milliseconds since epoch.
fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

impl<S: RowStore, N: Notifier> Session<S, N> {
    /// Moves a task to a new status, renumbering the affected groups, and
    /// persists the change-set through the batch priority path.
    ///
    /// A same-status call is a no-op and issues no store request.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`]; on store failure the local mutation is
    /// rolled back, and on a version conflict the session is additionally
    /// latched stale.
    pub async fn change_status(
        &mut self,
        key: &TaskKey,
        new_status: TaskStatus,
    ) -> Result<(), MutationError> {
        self.ensure_fresh()?;

        // Capture the groups the reconciliation can touch before it runs.
        let rollback = self.board.task(key).cloned().map_or_else(Vec::new, |anchor| {
            self.board
                .tasks()
                .filter(|t| {
                    t.key == *key
                        || (self.scope.orders_with(&anchor, t)
                            && (t.status == anchor.status || t.status == new_status))
                })
                .cloned()
                .collect()
        });

        let changed =
            reconcile::apply_status_change(&mut self.board, &self.scope, key, new_status)?;
        if changed.is_empty() {
            return Ok(());
        }
        let changes = self.priority_changes(&changed, Some(key))?;

        match self
            .store
            .update_priorities(&changes, &self.user.name)
            .await
        {
            Ok(rows) => {
                self.adopt_versions(&rows);
                tracing::info!(task = %key, status = %new_status, "status change persisted");
                Ok(())
            }
            Err(e) => {
                self.restore(rollback);
                Err(self.fail(e))
            }
        }
    }

    /// Applies a drag-and-drop order to one status group and persists the
    /// moved rows through the batch priority path.
    ///
    /// An order identical to the current one issues no store request.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`]; rollback and stale-latch behavior match
    /// [`Session::change_status`].
    pub async fn reorder(
        &mut self,
        status: TaskStatus,
        ordered: &[TaskKey],
    ) -> Result<(), MutationError> {
        self.ensure_fresh()?;

        // Only the listed tasks can change; capture them before reconciling.
        let rollback = self.snapshot_of(ordered);

        let changed = reconcile::apply_reorder(&mut self.board, &self.scope, status, ordered)?;
        if changed.is_empty() {
            return Ok(());
        }
        let changes = self.priority_changes(&changed, None)?;

        match self
            .store
            .update_priorities(&changes, &self.user.name)
            .await
        {
            Ok(rows) => {
                self.adopt_versions(&rows);
                tracing::info!(group = %status, moved = changes.len(), "reorder persisted");
                Ok(())
            }
            Err(e) => {
                self.restore(rollback);
                Err(self.fail(e))
            }
        }
    }

    /// Edits a task's fields (name, message, responsible) through the
    /// single-row conditional-update path.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`]; validation failures are rejected before
    /// any local mutation, store failures roll the edit back.
    pub async fn save_edit(&mut self, key: &TaskKey, edit: TaskEdit) -> Result<(), MutationError> {
        self.ensure_fresh()?;
        edit.validate()?;
        self.check_responsible(&edit.responsible)?;

        let prior = self
            .board
            .task(key)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownTask(key.clone()))?;
        let row = key
            .row_id()
            .ok_or_else(|| MutationError::Unpersisted(key.clone()))?;
        let expected_version = prior.version;

        if let Some(task) = self.board.task_mut(key) {
            task.name = edit.name.clone();
            task.message = edit.message.clone();
            task.responsible = edit.responsible.clone();
            task.modified_by = Some(self.user.name.clone());
            task.modified_at = Some(now_ms());
        }

        match self
            .store
            .conditional_update(row, &edit, expected_version, &self.user.name)
            .await
        {
            Ok(new_version) => {
                if let Some(task) = self.board.task_mut(key) {
                    task.version = new_version;
                }
                tracing::info!(task = %key, version = new_version, "edit persisted");
                Ok(())
            }
            Err(e) => {
                self.restore(vec![prior]);
                Err(self.fail(e))
            }
        }
    }

    /// Creates a task optimistically: a draft-keyed task appears on the
    /// board (and in projections) immediately, appended to the end of its
    /// status group; the store round-trip then replaces it with the
    /// confirmed row or removes it entirely.
    ///
    /// On success, every responsible employee other than the creator is
    /// notified, with an urgent variant when the task landed at the top of
    /// its group. Returns the confirmed task's key.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`]; validation failures are rejected before
    /// the draft is inserted, store failures remove it.
    pub async fn create(&mut self, draft: TaskDraft) -> Result<TaskKey, MutationError> {
        self.ensure_fresh()?;
        draft.validate()?;
        self.check_responsible(&draft.responsible)?;

        let optimistic = Task {
            key: TaskKey::draft(),
            name: draft.name.clone(),
            message: draft.message.clone(),
            status: draft.status,
            project: draft.project.clone(),
            responsible: draft.responsible.clone(),
            priority: 0,
            version: 0,
            modified_by: None,
            modified_at: None,
        };
        let priority = if draft.status.is_terminal() {
            SENTINEL_PRIORITY
        } else {
            self.board
                .tasks()
                .filter(|t| t.status == draft.status && self.scope.orders_with(&optimistic, t))
                .map(|t| t.priority)
                .max()
                .unwrap_or(0)
                + 1
        };

        let draft_key = optimistic.key.clone();
        self.board.insert(Task {
            priority,
            ..optimistic
        });

        match self.store.append(&draft, priority).await {
            Ok(stored) => {
                let confirmed_key = stored.key.clone();
                let urgent = stored.priority == 1;
                let assignees: Vec<String> = stored
                    .responsible
                    .iter()
                    .filter(|name| **name != self.user.name)
                    .cloned()
                    .collect();
                let task_name = stored.name.clone();
                self.board.replace_key(&draft_key, stored);

                for name in assignees {
                    if let Some(employee) = self.board.employee_named(&name) {
                        self.notifier
                            .task_assigned(&employee.user_id, &task_name, urgent);
                    } else {
                        tracing::warn!(name, "responsible name has no employee record");
                    }
                }

                tracing::info!(task = %confirmed_key, priority, "create persisted");
                Ok(confirmed_key)
            }
            Err(e) => {
                self.board.remove(&draft_key);
                Err(self.fail(e))
            }
        }
    }

    /// Refuses mutations on a session latched stale by a conflict.
    fn ensure_fresh(&self) -> Result<(), MutationError> {
        if self.stale {
            Err(MutationError::StaleSession)
        } else {
            Ok(())
        }
    }

    /// Rejects responsible names that match no registered employee.
    fn check_responsible(&self, names: &[String]) -> Result<(), MutationError> {
        for name in names {
            if self.board.employee_named(name).is_none() {
                return Err(ValidationError::UnknownResponsible(name.clone()).into());
            }
        }
        Ok(())
    }

    /// Clones the given tasks for rollback.
    fn snapshot_of(&self, keys: &[TaskKey]) -> Vec<Task> {
        keys.iter()
            .filter_map(|k| self.board.task(k).cloned())
            .collect()
    }

    /// Restores previously snapshotted tasks, field for field.
    fn restore(&mut self, snapshot: Vec<Task>) {
        for task in snapshot {
            self.board.insert(task);
        }
    }

    /// Builds the batch change-set for the given keys. The moved task (if
    /// any) also carries its new status; expected versions are the tasks'
    /// current ones, untouched by priority reconciliation.
    fn priority_changes(
        &self,
        keys: &[TaskKey],
        moved: Option<&TaskKey>,
    ) -> Result<Vec<PriorityChange>, MutationError> {
        let mut changes = Vec::with_capacity(keys.len());
        for key in keys {
            let row = key
                .row_id()
                .ok_or_else(|| MutationError::Unpersisted(key.clone()))?;
            let Some(task) = self.board.task(key) else {
                tracing::error!(task = %key, "changed key missing from board");
                continue;
            };
            changes.push(PriorityChange {
                row,
                priority: task.priority,
                status: (moved == Some(key)).then_some(task.status),
                expected_version: task.version,
            });
        }
        Ok(changes)
    }

    /// Applies store-returned versions to the local tasks.
    fn adopt_versions(&mut self, rows: &[(RowId, u64)]) {
        let stamp = now_ms();
        for (row, version) in rows {
            if let Some(task) = self.board.task_mut(&TaskKey::Row(*row)) {
                task.version = *version;
                task.modified_by = Some(self.user.name.clone());
                task.modified_at = Some(stamp);
            }
        }
    }

    /// Maps a store failure onto the mutation taxonomy; a version conflict
    /// additionally latches the session stale.
    fn fail(&mut self, error: StoreError) -> MutationError {
        match error {
            StoreError::VersionConflict {
                row,
                expected,
                actual,
            } => {
                self.stale = true;
                tracing::warn!(%row, expected, actual, "version conflict; session latched stale");
                MutationError::Conflict {
                    row,
                    expected,
                    actual,
                }
            }
            StoreError::NotFound(row) => MutationError::NotFound(row),
            StoreError::Timeout => MutationError::Timeout,
            other => MutationError::Transport(other.to_string()),
        }
    }
}
