//! Owned, single-writer board state.
//!
//! The [`Board`] holds the in-memory task collection for one session. It is
//! the only mutable client state: the mutation protocol writes to it, the
//! view projection reads from it, and nothing else touches it. There are no
//! ambient globals — callers pass the board by reference.

use std::collections::HashMap;

use taskdesk_proto::employee::Employee;
use taskdesk_proto::task::{Task, TaskKey};

/// In-memory task collection plus the employee directory.
#[derive(Debug, Default)]
pub struct Board {
    tasks: HashMap<TaskKey, Task>,
    employees: Vec<Employee>,
}

impl Board {
    /// Builds a board from a store snapshot.
    #[must_use]
    pub fn new(tasks: Vec<Task>, employees: Vec<Employee>) -> Self {
        let tasks = tasks.into_iter().map(|t| (t.key.clone(), t)).collect();
        Self { tasks, employees }
    }

    /// Returns the task with the given key, if present.
    #[must_use]
    pub fn task(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.get(key)
    }

    /// Returns a mutable reference to the task with the given key.
    ///
    /// Crate-private: only the reconciliation engine and the mutation
    /// protocol may rewrite task fields.
    pub(crate) fn task_mut(&mut self, key: &TaskKey) -> Option<&mut Task> {
        self.tasks.get_mut(key)
    }

    /// Iterates over all tasks in unspecified order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the board holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All registered employees.
    #[must_use]
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    /// Looks up an employee by display name.
    #[must_use]
    pub fn employee_named(&self, name: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.name == name)
    }

    /// Distinct project names across the board, sorted.
    #[must_use]
    pub fn project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.values().map(|t| t.project.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Inserts a task under its own key, replacing any existing entry.
    pub(crate) fn insert(&mut self, task: Task) {
        self.tasks.insert(task.key.clone(), task);
    }

    /// Removes and returns the task with the given key.
    pub(crate) fn remove(&mut self, key: &TaskKey) -> Option<Task> {
        self.tasks.remove(key)
    }

    /// Replaces a draft entry with its store-confirmed task.
    ///
    /// Removes the entry under `old` and inserts `task` under its own
    /// (store-assigned) key. Used when an optimistic create is confirmed.
    pub(crate) fn replace_key(&mut self, old: &TaskKey, task: Task) {
        self.tasks.remove(old);
        self.insert(task);
    }
}
