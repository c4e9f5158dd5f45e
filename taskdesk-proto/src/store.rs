//! Store protocol messages for the taskdesk row store.
//!
//! The client and the sheet service speak a request/reply protocol over a
//! single WebSocket: every [`StoreRequest`] carries a UUID v7 `request_id`
//! that the matching [`StoreReply`] echoes back. Payloads are
//! postcard-encoded binary frames (see [`crate::codec`]).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::employee::Employee;
use crate::task::{RowId, Task, TaskDraft, TaskEdit, TaskStatus};

/// One row of a batch priority update.
///
/// `expected_version` makes the batch path participate in optimistic
/// locking: the store validates every row's version before applying any
/// change, so a reorder racing a concurrent edit fails cleanly instead of
/// silently clobbering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChange {
    /// Row to update.
    pub row: RowId,
    /// New priority value.
    pub priority: u32,
    /// New status, when the row is also changing groups.
    pub status: Option<TaskStatus>,
    /// Version the client last observed for this row.
    pub expected_version: u64,
}

/// A request to the row store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Correlates the reply with this request.
    pub request_id: Uuid,
    /// The operation to perform.
    pub op: StoreOp,
}

/// Operations the row store supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreOp {
    /// Read every task row and the employee list.
    LoadAll,
    /// Resolve a chat identity to an employee record.
    ResolveRole {
        /// External chat identity to resolve.
        user_id: String,
    },
    /// Conditionally update one row's editable fields.
    Update {
        /// Row to update.
        row: RowId,
        /// Replacement field values.
        edit: TaskEdit,
        /// Version the client last observed; the update fails atomically
        /// on mismatch.
        expected_version: u64,
        /// Editor name for the audit columns.
        modified_by: String,
    },
    /// Apply a batch of priority (and optional status) changes atomically.
    UpdatePriorities {
        /// Rows to update, each with its expected version.
        changes: Vec<PriorityChange>,
        /// Editor name for the audit columns.
        modified_by: String,
    },
    /// Append a new task row.
    Append {
        /// Field values for the new task.
        draft: TaskDraft,
        /// Priority computed by the creating client.
        priority: u32,
    },
}

/// A reply from the row store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReply {
    /// Echo of the request's `request_id`.
    pub request_id: Uuid,
    /// The outcome of the operation.
    pub result: Result<StoreOk, StoreFault>,
}

/// Successful store operation outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreOk {
    /// Full board snapshot.
    Snapshot {
        /// All task rows, in row order.
        tasks: Vec<Task>,
        /// All registered employees.
        employees: Vec<Employee>,
    },
    /// Resolved employee record.
    Role {
        /// The employee matching the requested `user_id`.
        employee: Employee,
    },
    /// Conditional update applied.
    Updated {
        /// Row that was updated.
        row: RowId,
        /// The row's new version.
        new_version: u64,
    },
    /// Batch priority update applied.
    PrioritiesUpdated {
        /// New version for every updated row.
        rows: Vec<(RowId, u64)>,
    },
    /// Append applied.
    Appended {
        /// The stored task, with its assigned row id and version 0.
        task: Task,
    },
}

/// Store-side failures, serialized back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StoreFault {
    /// Another writer updated the row first.
    #[error("row {row} was changed by another user (expected version {expected}, found {actual})")]
    VersionConflict {
        /// Row whose version no longer matches.
        row: RowId,
        /// Version the client expected.
        expected: u64,
        /// Version currently in the store.
        actual: u64,
    },
    /// The row does not exist.
    #[error("row not found: {0}")]
    RowNotFound(RowId),
    /// The user is not a registered employee.
    #[error("unauthorized: user {0} is not registered")]
    Unauthorized(String),
    /// The request was malformed or violated a store rule.
    #[error("invalid request: {0}")]
    Invalid(String),
}
