//! In-process row store for offline demo mode and tests.
//!
//! [`MemStore`] applies the same conditional-write semantics as the sheet
//! service (per-row version checks, atomic batches, row-id assignment),
//! just without a network in between. Cloning a `MemStore` shares the
//! underlying rows, so two sessions over clones of one store genuinely
//! race — which is exactly what the conflict tests need.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use taskdesk_proto::employee::{Employee, Role};
use taskdesk_proto::store::PriorityChange;
use taskdesk_proto::task::{
    RowId, SENTINEL_PRIORITY, Task, TaskDraft, TaskEdit, TaskKey, TaskStatus,
};

use super::{RowStore, Snapshot, StoreError};

/// Shared in-memory row store.
#[derive(Clone, Debug)]
pub struct MemStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug)]
struct Inner {
    rows: BTreeMap<RowId, Task>,
    employees: Vec<Employee>,
    next_row: u32,
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

impl MemStore {
    /// Creates an empty store with the given employee directory.
    #[must_use]
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                rows: BTreeMap::new(),
                employees,
                next_row: 1,
            })),
        }
    }

    /// Creates a store pre-populated with tasks.
    ///
    /// Tasks must already carry `Row` keys; rows without a name are skipped
    /// (blank spreadsheet rows). The next assigned row id continues after
    /// the highest seeded one.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>, employees: Vec<Employee>) -> Self {
        let mut rows = BTreeMap::new();
        let mut max_row = 0;
        for task in tasks {
            if task.name.trim().is_empty() {
                continue;
            }
            if let Some(row) = task.key.row_id() {
                max_row = max_row.max(row.get());
                rows.insert(row, task);
            }
        }
        Self {
            inner: Arc::new(RwLock::new(Inner {
                rows,
                employees,
                next_row: max_row + 1,
            })),
        }
    }

    /// A small seeded board for offline demo mode.
    #[must_use]
    pub fn demo() -> Self {
        let employees = vec![
            Employee {
                user_id: "1".to_string(),
                name: "Olga".to_string(),
                role: Role::Owner,
                phone: Some("+1 555 0100".to_string()),
            },
            Employee {
                user_id: "2".to_string(),
                name: "Alice".to_string(),
                role: Role::Admin,
                phone: None,
            },
            Employee {
                user_id: "3".to_string(),
                name: "Bob".to_string(),
                role: Role::User,
                phone: None,
            },
        ];
        let task = |row: u32, name: &str, status: TaskStatus, project: &str, resp: &[&str], priority: u32| Task {
            key: TaskKey::Row(RowId::new(row)),
            name: name.to_string(),
            message: None,
            status,
            project: project.to_string(),
            responsible: resp.iter().map(ToString::to_string).collect(),
            priority,
            version: 0,
            modified_by: None,
            modified_at: None,
        };
        Self::with_tasks(
            vec![
                task(1, "Wire up the pump controller", TaskStatus::InProgress, "Atlas", &["Bob"], 1),
                task(2, "Order spare valves", TaskStatus::Queued, "Atlas", &["Bob"], 1),
                task(3, "Review wiring diagram", TaskStatus::Queued, "Atlas", &["Alice"], 2),
                task(4, "Archive old manuals", TaskStatus::Done, "Atlas", &["Alice"], SENTINEL_PRIORITY),
                task(5, "Draft launch checklist", TaskStatus::Queued, "Borealis", &["Bob"], 1),
            ],
            employees,
        )
    }

    /// Number of task rows currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Returns `true` if no task rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }
}

impl RowStore for MemStore {
    async fn load_all(&self) -> Result<Snapshot, StoreError> {
        let inner = self.inner.read();
        Ok(Snapshot {
            tasks: inner.rows.values().cloned().collect(),
            employees: inner.employees.clone(),
        })
    }

    async fn resolve_role(&self, user_id: &str) -> Result<Employee, StoreError> {
        let inner = self.inner.read();
        inner
            .employees
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::Unauthorized(user_id.to_string()))
    }

    async fn conditional_update(
        &self,
        row: RowId,
        edit: &TaskEdit,
        expected_version: u64,
        modified_by: &str,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let task = inner.rows.get_mut(&row).ok_or(StoreError::NotFound(row))?;
        if task.version != expected_version {
            return Err(StoreError::VersionConflict {
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
        Ok(task.version)
    }

    async fn update_priorities(
        &self,
        changes: &[PriorityChange],
        modified_by: &str,
    ) -> Result<Vec<(RowId, u64)>, StoreError> {
        let mut inner = self.inner.write();

        // Validate every row before touching any of them.
        for change in changes {
            let task = inner
                .rows
                .get(&change.row)
                .ok_or(StoreError::NotFound(change.row))?;
            if task.version != change.expected_version {
                return Err(StoreError::VersionConflict {
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
        Ok(new_versions)
    }

    async fn append(&self, draft: &TaskDraft, priority: u32) -> Result<Task, StoreError> {
        if draft.name.trim().is_empty() {
            return Err(StoreError::Rejected("task name cannot be empty".to_string()));
        }
        let mut inner = self.inner.write();
        let row = RowId::new(inner.next_row);
        inner.next_row += 1;
        let task = Task {
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
        };
        inner.rows.insert(row, task.clone());
        Ok(task)
    }
}
