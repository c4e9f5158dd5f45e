//! The authoritative row store.
//!
//! [`SheetStore`] holds the task rows, the employee directory, and the
//! access log behind a [`RwLock`]. It is the single source of truth shared
//! by every client; the per-row `version` column is the only cross-client
//! coordination primitive. Writes are conditional: the single-row path
//! checks one expected version, the batch path validates every row before
//! applying any change and fails atomically on the first mismatch.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

use taskdesk_proto::employee::Employee;
use taskdesk_proto::store::{PriorityChange, StoreFault};
use taskdesk_proto::task::{RowId, Task, TaskDraft, TaskEdit, TaskKey};

/// One access-log entry, recorded on every role resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    /// Milliseconds since epoch.
    pub timestamp_ms: u64,
    /// Chat identity that opened a session.
    pub user_id: String,
}

/// Shared row store state.
pub struct SheetStore {
    inner: RwLock<Inner>,
}

struct Inner {
    rows: BTreeMap<RowId, Task>,
    employees: Vec<Employee>,
    access_log: Vec<AccessRecord>,
    next_row: u32,
}

impl Default for SheetStore {
    fn default() -> Self {
        Self::new()
    }
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

impl SheetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: BTreeMap::new(),
                employees: Vec::new(),
                access_log: Vec::new(),
                next_row: 1,
            }),
        }
    }

    /// Loads the employee directory and seed tasks.
    ///
    /// Seed rows without a name are skipped, the way blank spreadsheet rows
    /// are. Returns the number of task rows loaded.
    pub async fn seed(
        &self,
        employees: Vec<Employee>,
        tasks: Vec<(TaskDraft, u32)>,
    ) -> usize {
        let mut inner = self.inner.write().await;
        inner.employees = employees;
        let mut loaded = 0;
        for (draft, priority) in tasks {
            if draft.name.trim().is_empty() {
                continue;
            }
            let row = RowId::new(inner.next_row);
            inner.next_row += 1;
            inner.rows.insert(row, stored_task(row, &draft, priority));
            loaded += 1;
        }
        loaded
    }

    /// Reads every task row (in row order) and the employee directory.
    pub async fn load_all(&self) -> (Vec<Task>, Vec<Employee>) {
        let inner = self.inner.read().await;
        (
            inner.rows.values().cloned().collect(),
            inner.employees.clone(),
        )
    }

    /// Resolves a chat identity to an employee record, recording the access.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Unauthorized`] for identities with no employee
    /// record.
    pub async fn resolve_role(&self, user_id: &str) -> Result<Employee, StoreFault> {
        let mut inner = self.inner.write().await;
        inner.access_log.push(AccessRecord {
            timestamp_ms: now_ms(),
            user_id: user_id.to_string(),
        });
        inner
            .employees
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreFault::Unauthorized(user_id.to_string()))
    }

    /// Conditionally updates one row's editable fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::RowNotFound`] for unknown rows and
    /// [`StoreFault::VersionConflict`] when `expected_version` no longer
    /// matches; the row is untouched in both cases.
    pub async fn conditional_update(
        &self,
        row: RowId,
        edit: &TaskEdit,
        expected_version: u64,
        modified_by: &str,
    ) -> Result<u64, StoreFault> {
        let mut inner = self.inner.write().await;
        let task = inner
            .rows
            .get_mut(&row)
            .ok_or(StoreFault::RowNotFound(row))?;
        if task.version != expected_version {
            return Err(StoreFault::VersionConflict {
                row,
                expected: expected_version,
                actual: task.version,
            });
        }
        task.name = edit.name.clone();
        task.message = edit.message.clone();
        task.responsible = edit.responsible.clone();
        task.version += 1;
        task.modified_by = Some(modified_by.to_string());
        task.modified_at = Some(now_ms());
        tracing::debug!(%row, version = task.version, by = modified_by, "row updated");
        Ok(task.version)
    }

    /// Applies a batch of priority/status changes atomically.
    ///
    /// Every row is validated (existence, expected version, uniqueness
    /// within the batch) before any change is applied.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreFault`] found during validation; no row is
    /// modified in that case.
    pub async fn update_priorities(
        &self,
        changes: &[PriorityChange],
        modified_by: &str,
    ) -> Result<Vec<(RowId, u64)>, StoreFault> {
        let mut inner = self.inner.write().await;

        let mut seen = std::collections::HashSet::new();
        for change in changes {
            if !seen.insert(change.row) {
                return Err(StoreFault::Invalid(format!(
                    "row {} appears twice in one batch",
                    change.row
                )));
            }
            let task = inner
                .rows
                .get(&change.row)
                .ok_or(StoreFault::RowNotFound(change.row))?;
            if task.version != change.expected_version {
                return Err(StoreFault::VersionConflict {
                    row: change.row,
                    expected: change.expected_version,
                    actual: task.version,
                });
            }
        }

        let stamp = now_ms();
        let mut new_versions = Vec::with_capacity(changes.len());
        for change in changes {
            if let Some(task) = inner.rows.get_mut(&change.row) {
                task.priority = change.priority;
                if let Some(status) = change.status {
                    task.status = status;
                }
                task.version += 1;
                task.modified_by = Some(modified_by.to_string());
                task.modified_at = Some(stamp);
                new_versions.push((change.row, task.version));
            }
        }
        tracing::debug!(rows = new_versions.len(), by = modified_by, "batch applied");
        Ok(new_versions)
    }

    /// Appends a new task row, assigning the next row id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Invalid`] for drafts with a blank name.
    pub async fn append(&self, draft: &TaskDraft, priority: u32) -> Result<Task, StoreFault> {
        if draft.name.trim().is_empty() {
            return Err(StoreFault::Invalid("task name cannot be empty".to_string()));
        }
        let mut inner = self.inner.write().await;
        let row = RowId::new(inner.next_row);
        inner.next_row += 1;
        let task = stored_task(row, draft, priority);
        inner.rows.insert(row, task.clone());
        tracing::debug!(%row, name = %task.name, "row appended");
        Ok(task)
    }

    /// Snapshot of the access log, oldest first.
    pub async fn access_log(&self) -> Vec<AccessRecord> {
        self.inner.read().await.access_log.clone()
    }

    /// Number of task rows currently stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    /// Returns `true` if no task rows are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }
}

/// Materializes a draft into a stored task (version 0, no audit stamps).
fn stored_task(row: RowId, draft: &TaskDraft, priority: u32) -> Task {
    Task {
        key: TaskKey::Row(row),
        name: draft.name.clone(),
        message: draft.message.clone(),
        status: draft.status,
        project: draft.project.clone(),
        responsible: draft.responsible.clone(),
        priority,
        version: 0,
        modified_by: None,
        modified_at: None,
    }
}
