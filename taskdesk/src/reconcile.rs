//! Priority reconciliation engine.
//!
//! Recomputes per-status-group priorities when a task changes status or a
//! group is reordered by drag-and-drop, keeping two invariants:
//!
//! 1. Within one ordering scope, every non-terminal status group holds a
//!    dense ascending `1..N` priority sequence with no duplicates or gaps.
//! 2. Terminal-status tasks are pinned to [`SENTINEL_PRIORITY`] and
//!    excluded from the dense sequence.
//!
//! Both operations mutate the board in place and return the exact set of
//! keys whose `status` and/or `priority` changed value — the change-set the
//! caller must persist.

use std::collections::HashSet;

use taskdesk_proto::task::{SENTINEL_PRIORITY, Task, TaskKey, TaskStatus};

use crate::board::Board;
use crate::scope::ViewScope;

/// Errors for reconciliation preconditions, detected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The key does not refer to a task on the board.
    #[error("unknown task: {0}")]
    UnknownTask(TaskKey),
    /// The task is not visible in the current view scope.
    #[error("task {0} is outside the current view scope")]
    OutOfScope(TaskKey),
    /// The terminal group has no order to permute.
    #[error("the {0} group cannot be reordered")]
    TerminalGroup(TaskStatus),
    /// The reorder list is not a permutation of the status group.
    #[error("reorder list is not a permutation of the {status} group ({got} of {expected} tasks)")]
    NotAPermutation {
        /// Group being reordered.
        status: TaskStatus,
        /// Size of the group within scope.
        expected: usize,
        /// Size of the supplied list.
        got: usize,
    },
}

/// Moves a task to a new status and renumbers the affected groups.
///
/// Steps, in order:
/// 1. no-op when the status is unchanged (guards against redundant writes);
/// 2. terminal target: pin the task to the sentinel priority; otherwise
///    append it to the end of its new group (`max + 1`, `1` for an empty
///    group) — a plain status change never inserts mid-group;
/// 3. renumber the old group `1..len` in ascending-priority order, closing
///    the gap the task left behind.
///
/// Returns the keys whose `status` and/or `priority` changed value.
///
/// # Errors
///
/// Returns [`ReconcileError`] if the task is unknown or out of scope.
/// The board is untouched on error.
pub fn apply_status_change(
    board: &mut Board,
    scope: &ViewScope,
    key: &TaskKey,
    new_status: TaskStatus,
) -> Result<Vec<TaskKey>, ReconcileError> {
    let anchor = board
        .task(key)
        .cloned()
        .ok_or_else(|| ReconcileError::UnknownTask(key.clone()))?;
    if !scope.contains(&anchor) {
        return Err(ReconcileError::OutOfScope(key.clone()));
    }
    if anchor.status == new_status {
        return Ok(Vec::new());
    }

    let old_status = anchor.status;
    let new_priority = if new_status.is_terminal() {
        SENTINEL_PRIORITY
    } else {
        group_max_priority(board, scope, &anchor, new_status, Some(key)) + 1
    };

    let mut changed = Vec::new();
    if let Some(task) = board.task_mut(key) {
        task.status = new_status;
        task.priority = new_priority;
        changed.push(key.clone());
    }

    // The moved task no longer matches old_status, so it is excluded here.
    changed.extend(renumber_group(board, scope, &anchor, old_status));

    tracing::debug!(
        task = %key,
        from = %old_status,
        to = %new_status,
        priority = new_priority,
        changed = changed.len(),
        "status change reconciled"
    );
    Ok(changed)
}

/// Applies a drag-and-drop order to one status group.
///
/// `ordered` must be a permutation of the keys currently in the group
/// within scope — membership cannot change here, only order. The list's
/// order is authoritative: position `i` receives priority `i + 1`.
///
/// Returns the keys whose priority actually changed value (possibly
/// empty); applying the same order twice is therefore a no-op the second
/// time.
///
/// # Errors
///
/// Returns [`ReconcileError`] if the group is terminal, a key is unknown
/// or out of scope, or the list is not a permutation of the group. The
/// board is untouched on error.
pub fn apply_reorder(
    board: &mut Board,
    scope: &ViewScope,
    status: TaskStatus,
    ordered: &[TaskKey],
) -> Result<Vec<TaskKey>, ReconcileError> {
    if status.is_terminal() {
        return Err(ReconcileError::TerminalGroup(status));
    }
    // An empty list is a permutation of an empty group.
    let Some(first) = ordered.first() else {
        return Ok(Vec::new());
    };
    let anchor = board
        .task(first)
        .cloned()
        .ok_or_else(|| ReconcileError::UnknownTask(first.clone()))?;
    if !scope.contains(&anchor) {
        return Err(ReconcileError::OutOfScope(first.clone()));
    }

    let group: HashSet<TaskKey> = board
        .tasks()
        .filter(|t| t.status == status && scope.orders_with(&anchor, t))
        .map(|t| t.key.clone())
        .collect();

    let mut seen = HashSet::with_capacity(ordered.len());
    let is_permutation = ordered.len() == group.len()
        && ordered
            .iter()
            .all(|k| group.contains(k) && seen.insert(k.clone()));
    if !is_permutation {
        return Err(ReconcileError::NotAPermutation {
            status,
            expected: group.len(),
            got: ordered.len(),
        });
    }

    let mut changed = Vec::new();
    for (index, key) in ordered.iter().enumerate() {
        // Safe cast: group sizes are far below u32::MAX.
        #[allow(clippy::cast_possible_truncation)]
        let want = index as u32 + 1;
        if let Some(task) = board.task_mut(key)
            && task.priority != want
        {
            task.priority = want;
            changed.push(key.clone());
        }
    }

    tracing::debug!(
        group = %status,
        size = ordered.len(),
        changed = changed.len(),
        "reorder reconciled"
    );
    Ok(changed)
}

/// Highest priority in a status group within the anchor's ordering scope,
/// optionally excluding one key; `0` if the group is empty.
fn group_max_priority(
    board: &Board,
    scope: &ViewScope,
    anchor: &Task,
    status: TaskStatus,
    exclude: Option<&TaskKey>,
) -> u32 {
    board
        .tasks()
        .filter(|t| {
            t.status == status
                && scope.orders_with(anchor, t)
                && exclude.is_none_or(|k| t.key != *k)
        })
        .map(|t| t.priority)
        .max()
        .unwrap_or(0)
}

/// Renumbers a status group `1..len` in ascending-priority order.
///
/// Ties (which only occur if the board was loaded in an already-degenerate
/// state) break deterministically by key. Returns the keys whose priority
/// changed value.
fn renumber_group(
    board: &mut Board,
    scope: &ViewScope,
    anchor: &Task,
    status: TaskStatus,
) -> Vec<TaskKey> {
    let mut members: Vec<(TaskKey, u32)> = board
        .tasks()
        .filter(|t| t.status == status && scope.orders_with(anchor, t))
        .map(|t| (t.key.clone(), t.priority))
        .collect();
    members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let mut changed = Vec::new();
    for (index, (key, old_priority)) in members.into_iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let want = index as u32 + 1;
        if old_priority != want
            && let Some(task) = board.task_mut(&key)
        {
            task.priority = want;
            changed.push(key);
        }
    }
    changed
}
