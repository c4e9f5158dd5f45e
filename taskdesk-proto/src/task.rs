//! Core task model for `taskdesk`.
//!
//! Defines the row-keyed [`Task`] record, the closed [`TaskStatus`] set with
//! its display precedence, the draft/row identifier split used by the
//! optimistic create flow, and validation for user-supplied task fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task name length in characters.
pub const MAX_TASK_NAME_LENGTH: usize = 256;

/// Reserved priority for terminal-status tasks.
///
/// Tasks in the terminal status are pinned to this value and excluded from
/// the dense `1..N` ordering of their former group.
pub const SENTINEL_PRIORITY: u32 = 999;

/// Stable row identifier assigned by the store at append time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RowId(u32);

impl RowId {
    /// Creates a row identifier from its raw row number.
    #[must_use]
    pub const fn new(row: u32) -> Self {
        Self(row)
    }

    /// Returns the raw row number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side task identity.
///
/// A task is either backed by a store row ([`TaskKey::Row`]) or exists only
/// locally as an optimistically created draft ([`TaskKey::Draft`], UUID v7).
/// The two variants cannot collide by construction; a draft key is replaced
/// by its row key once the store confirms the append.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKey {
    /// A persisted task, identified by its store row.
    Row(RowId),
    /// A locally created task awaiting store confirmation.
    Draft(Uuid),
}

impl TaskKey {
    /// Creates a fresh draft key (time-ordered UUID v7).
    #[must_use]
    pub fn draft() -> Self {
        Self::Draft(Uuid::now_v7())
    }

    /// Returns the backing row identifier, or `None` for drafts.
    #[must_use]
    pub const fn row_id(&self) -> Option<RowId> {
        match self {
            Self::Row(row) => Some(*row),
            Self::Draft(_) => None,
        }
    }

    /// Returns `true` if this key refers to an unconfirmed draft.
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }
}

impl From<RowId> for TaskKey {
    fn from(row: RowId) -> Self {
        Self::Row(row)
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Row(row) => write!(f, "{row}"),
            Self::Draft(uuid) => write!(f, "draft-{uuid}"),
        }
    }
}

/// Status of a task on the board.
///
/// The variant order here is the fixed display precedence: groups are
/// rendered in this order, and [`TaskStatus::Done`] is the terminal status
/// whose members carry the [`SENTINEL_PRIORITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is actively being worked on.
    InProgress,
    /// Task is waiting to be picked up.
    Queued,
    /// Task is parked pending an external dependency.
    OnHold,
    /// Task is finished (terminal).
    Done,
}

impl TaskStatus {
    /// All statuses in display precedence order.
    pub const ALL: [Self; 4] = [Self::InProgress, Self::Queued, Self::OnHold, Self::Done];

    /// Display precedence of this status (lower renders first).
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::InProgress => 0,
            Self::Queued => 1,
            Self::OnHold => 2,
            Self::Done => 3,
        }
    }

    /// Returns `true` for the terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Queued => write!(f, "queued"),
            Self::OnHold => write!(f, "on_hold"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "queued" => Ok(Self::Queued),
            "on_hold" => Ok(Self::OnHold),
            "done" => Ok(Self::Done),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized status: {0} (expected in_progress, queued, on_hold, or done)")]
pub struct ParseStatusError(String);

/// A task on the shared board.
///
/// `priority` orders tasks within their status group (lower = more urgent);
/// `version` is the optimistic-lock token, bumped by the store on every
/// successful write. `modified_by` / `modified_at` are audit metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identity (store row, or local draft awaiting confirmation).
    pub key: TaskKey,
    /// Task name.
    pub name: String,
    /// Optional note for the people responsible.
    pub message: Option<String>,
    /// Current status.
    pub status: TaskStatus,
    /// Project this task belongs to.
    pub project: String,
    /// Names of the responsible employees.
    pub responsible: Vec<String>,
    /// Position within the status group (1 = most urgent, 999 = terminal).
    pub priority: u32,
    /// Optimistic-lock token; bumped on every successful store write.
    pub version: u64,
    /// Name of the last editor, if any.
    pub modified_by: Option<String>,
    /// Milliseconds since epoch of the last edit, if any.
    pub modified_at: Option<u64>,
}

/// Fields for creating a new task.
///
/// Priority is not part of the draft: the creating client computes the
/// task's position in its status group and passes it alongside the draft
/// in the append request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task name (required, non-empty).
    pub name: String,
    /// Optional note for the people responsible.
    pub message: Option<String>,
    /// Initial status.
    pub status: TaskStatus,
    /// Project the task belongs to (required, non-empty).
    pub project: String,
    /// Names of the responsible employees.
    pub responsible: Vec<String>,
}

impl TaskDraft {
    /// Validates this draft before any local mutation or store call.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the name is empty or too long, or the
    /// project is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if self.project.trim().is_empty() {
            return Err(ValidationError::EmptyProject);
        }
        Ok(())
    }
}

/// Replacement field values for an existing task.
///
/// Edits deliberately cannot touch `status`, `project`, or `priority`:
/// status moves go through the reconciliation engine so that group
/// renumbering stays consistent, and a task's project is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdit {
    /// New task name (required, non-empty).
    pub name: String,
    /// New note, or `None` to clear it.
    pub message: Option<String>,
    /// New set of responsible employee names.
    pub responsible: Vec<String>,
}

impl TaskEdit {
    /// Validates this edit before any local mutation or store call.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the name is empty or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}

/// Errors for user-supplied task fields, rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task name cannot be empty.
    #[error("task name cannot be empty")]
    EmptyName,
    /// Task name exceeds the maximum length.
    #[error("task name too long ({len} characters, max {max})")]
    NameTooLong {
        /// Actual length in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Project cannot be empty.
    #[error("project cannot be empty")]
    EmptyProject,
    /// A responsible name does not match any registered employee.
    #[error("unknown responsible employee: {0}")]
    UnknownResponsible(String),
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_TASK_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            len,
            max: MAX_TASK_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Joins responsible names into the comma-separated storage form.
#[must_use]
pub fn join_responsible(names: &[String]) -> String {
    names.join(", ")
}

/// Splits the comma-separated storage form into responsible names.
///
/// Whitespace around names is trimmed and empty entries are dropped.
#[must_use]
pub fn split_responsible(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
