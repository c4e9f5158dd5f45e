//! Row store abstraction for the taskdesk client.
//!
//! Defines the [`RowStore`] trait — the client's only window onto the
//! shared backing store — and the client-side error taxonomy. Concrete
//! implementations:
//! - [`memory::MemStore`] — in-process store for offline demo mode and tests
//! - [`remote::RemoteStore`] — WebSocket connection to a sheet service

pub mod memory;
pub mod remote;

use taskdesk_proto::employee::Employee;
use taskdesk_proto::store::{PriorityChange, StoreFault};
use taskdesk_proto::task::{RowId, Task, TaskDraft, TaskEdit};

/// A full read of the store: all task rows plus the employee directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// All task rows, in row order.
    pub tasks: Vec<Task>,
    /// All registered employees.
    pub employees: Vec<Employee>,
}

/// Client-side store failures.
///
/// Every store-facing failure is one of these; the mutation protocol maps
/// them onto its own taxonomy (conflict, not-found, transport) and decides
/// rollback behavior.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer updated the row first; the caller must reload.
    #[error("row {row} was changed by another user (expected version {expected}, found {actual})")]
    VersionConflict {
        /// Row whose version no longer matches.
        row: RowId,
        /// Version the client expected.
        expected: u64,
        /// Version currently in the store.
        actual: u64,
    },
    /// The row no longer exists in the store.
    #[error("row not found: {0}")]
    NotFound(RowId),
    /// The user is not a registered employee.
    #[error("unauthorized: user {0} is not registered")]
    Unauthorized(String),
    /// The store rejected the request as malformed.
    #[error("store rejected request: {0}")]
    Rejected(String),
    /// The request did not complete within the configured timeout.
    #[error("store request timed out")]
    Timeout,
    /// The store could not be reached, or the connection failed mid-call.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<StoreFault> for StoreError {
    fn from(fault: StoreFault) -> Self {
        match fault {
            StoreFault::VersionConflict {
                row,
                expected,
                actual,
            } => Self::VersionConflict {
                row,
                expected,
                actual,
            },
            StoreFault::RowNotFound(row) => Self::NotFound(row),
            StoreFault::Unauthorized(user) => Self::Unauthorized(user),
            StoreFault::Invalid(reason) => Self::Rejected(reason),
        }
    }
}

/// Asynchronous row store contract.
///
/// All writes are conditional: the single-row path checks one expected
/// version, the batch path checks every row's expected version before
/// applying any change. Implementations must fail atomically — a rejected
/// write leaves the store untouched.
pub trait RowStore: Send + Sync {
    /// Reads every task row and the employee directory.
    fn load_all(&self) -> impl std::future::Future<Output = Result<Snapshot, StoreError>> + Send;

    /// Resolves a chat identity to an employee record.
    fn resolve_role(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Employee, StoreError>> + Send;

    /// Conditionally updates one row's editable fields, returning the new
    /// version.
    fn conditional_update(
        &self,
        row: RowId,
        edit: &TaskEdit,
        expected_version: u64,
        modified_by: &str,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Applies a batch of priority/status changes atomically, returning the
    /// new version of every updated row.
    fn update_priorities(
        &self,
        changes: &[PriorityChange],
        modified_by: &str,
    ) -> impl std::future::Future<Output = Result<Vec<(RowId, u64)>, StoreError>> + Send;

    /// Appends a new task row, returning the stored task with its assigned
    /// row id and version 0.
    fn append(
        &self,
        draft: &TaskDraft,
        priority: u32,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;
}
