//! View projection: the role-scoped, grouped, ordered presentation list.
//!
//! A pure function of (board, scope) — no side effects, no store calls,
//! and deterministic: identical input always produces an identical
//! structure regardless of map iteration order or wall-clock state.

use std::collections::BTreeMap;

use taskdesk_proto::task::{Task, TaskStatus};

use crate::board::Board;
use crate::scope::ViewScope;

/// The fully derived presentation structure for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedBoard {
    /// One view per project for elevated roles; a single personal view for
    /// the basic role.
    pub views: Vec<ProjectView>,
}

/// Tasks of one project (or of one user's personal list), grouped by status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectView {
    /// Project name, or the user's name for the personal view.
    pub name: String,
    /// Non-empty status groups in display precedence order.
    pub groups: Vec<StatusGroup>,
}

/// One status group, ordered by ascending priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusGroup {
    /// The shared status.
    pub status: TaskStatus,
    /// Member tasks, most urgent first.
    pub tasks: Vec<Task>,
}

/// Derives the presentation list for a scope.
///
/// Basic role: a single view named for the user, holding only that user's
/// tasks, with terminal-status tasks filtered out entirely — a user never
/// scrolls past finished work.
///
/// Elevated roles: one view per project (sorted by name), terminal tasks
/// retained; the sentinel priority already sorts them last within the
/// `done` group's position in the precedence order.
#[must_use]
pub fn project(board: &Board, scope: &ViewScope) -> ProjectedBoard {
    let views = match scope {
        ViewScope::Personal { user } => {
            let mine: Vec<&Task> = board
                .tasks()
                .filter(|t| scope.contains(t) && !t.status.is_terminal())
                .collect();
            if mine.is_empty() {
                Vec::new()
            } else {
                vec![ProjectView {
                    name: user.clone(),
                    groups: status_groups(mine),
                }]
            }
        }
        ViewScope::AllProjects => {
            let mut by_project: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
            for task in board.tasks() {
                by_project.entry(task.project.as_str()).or_default().push(task);
            }
            by_project
                .into_iter()
                .map(|(name, tasks)| ProjectView {
                    name: name.to_string(),
                    groups: status_groups(tasks),
                })
                .collect()
        }
    };
    ProjectedBoard { views }
}

/// Groups tasks by status in precedence order, dropping empty groups.
///
/// Within a group, tasks sort by ascending priority, tie-broken by key so
/// that the terminal group (all sentinel priorities) has a stable order.
fn status_groups(tasks: Vec<&Task>) -> Vec<StatusGroup> {
    TaskStatus::ALL
        .iter()
        .filter_map(|&status| {
            let mut members: Vec<&Task> = tasks.iter().filter(|t| t.status == status).copied().collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.key.cmp(&b.key)));
            Some(StatusGroup {
                status,
                tasks: members.into_iter().cloned().collect(),
            })
        })
        .collect()
}
