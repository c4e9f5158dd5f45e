//! View scope: which tasks a session can see and order.
//!
//! The scope is computed once from the resolved employee record and then
//! consumed uniformly by the projection and the reconciliation engine, so
//! role checks live in exactly one place.

use taskdesk_proto::employee::Employee;
use taskdesk_proto::task::Task;

/// The bounded set of tasks a session sees and orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// Basic role: the user's own assignment list, across all projects.
    Personal {
        /// The user's display name, matched against task `responsible`.
        user: String,
    },
    /// Elevated role: every project on the board.
    AllProjects,
}

impl ViewScope {
    /// Computes the scope for a resolved employee.
    #[must_use]
    pub fn for_user(employee: &Employee) -> Self {
        if employee.role.is_elevated() {
            Self::AllProjects
        } else {
            Self::Personal {
                user: employee.name.clone(),
            }
        }
    }

    /// Returns `true` if the task is visible in this scope.
    #[must_use]
    pub fn contains(&self, task: &Task) -> bool {
        match self {
            Self::Personal { user } => task.responsible.iter().any(|name| name == user),
            Self::AllProjects => true,
        }
    }

    /// Returns `true` if `other` shares an ordering scope with `anchor`.
    ///
    /// Priorities are dense per status group *within one ordering scope*:
    /// the anchor task's project for elevated roles, the user's whole
    /// assignment list for the basic role. Status grouping is applied on
    /// top of this by the caller.
    #[must_use]
    pub fn orders_with(&self, anchor: &Task, other: &Task) -> bool {
        match self {
            Self::Personal { .. } => self.contains(other),
            Self::AllProjects => other.project == anchor.project,
        }
    }
}
