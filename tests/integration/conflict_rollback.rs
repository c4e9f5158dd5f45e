//! Integration tests for the confirm-or-rollback half of the optimistic
//! mutation protocol: version conflicts between sessions, exact rollback
//! on store failures, the stale-session latch, and optimistic create
//! removal.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::redundant_clone)]

use taskdesk::mutation::MutationError;
use taskdesk::notify::LogNotifier;
use taskdesk::session::Session;
use taskdesk::store::memory::MemStore;
use taskdesk::store::{RowStore, Snapshot, StoreError};
use taskdesk_proto::employee::{Employee, Role};
use taskdesk_proto::store::PriorityChange;
use taskdesk_proto::task::{
    RowId, Task, TaskDraft, TaskEdit, TaskKey, TaskStatus,
};

// ---------------------------------------------------------------------------
// Helper functions and a failure-injecting store
// ---------------------------------------------------------------------------

fn employees() -> Vec<Employee> {
    vec![
        Employee {
            user_id: "1".to_string(),
            name: "Olga".to_string(),
            role: Role::Owner,
            phone: None,
        },
        Employee {
            user_id: "2".to_string(),
            name: "Alice".to_string(),
            role: Role::Admin,
            phone: None,
        },
    ]
}

fn make_task(row: u32, status: TaskStatus, priority: u32) -> Task {
    Task {
        key: TaskKey::Row(RowId::new(row)),
        name: format!("task {row}"),
        message: Some("original note".to_string()),
        status,
        project: "Atlas".to_string(),
        responsible: vec!["Alice".to_string()],
        priority,
        version: 0,
        modified_by: None,
        modified_at: None,
    }
}

fn key(row: u32) -> TaskKey {
    TaskKey::Row(RowId::new(row))
}

fn make_edit(name: &str) -> TaskEdit {
    TaskEdit {
        name: name.to_string(),
        message: Some("edited note".to_string()),
        responsible: vec!["Olga".to_string()],
    }
}

/// Which error every write operation should fail with.
#[derive(Clone, Copy)]
enum FailMode {
    Transport,
    NotFound,
    Timeout,
}

impl FailMode {
    fn to_error(self, row: RowId) -> StoreError {
        match self {
            Self::Transport => StoreError::Transport("wire cut".to_string()),
            Self::NotFound => StoreError::NotFound(row),
            Self::Timeout => StoreError::Timeout,
        }
    }
}

/// Store whose reads work but whose writes always fail.
struct FlakyStore {
    inner: MemStore,
    mode: FailMode,
}

impl FlakyStore {
    fn new(inner: MemStore, mode: FailMode) -> Self {
        Self { inner, mode }
    }
}

impl RowStore for FlakyStore {
    async fn load_all(&self) -> Result<Snapshot, StoreError> {
        self.inner.load_all().await
    }

    async fn resolve_role(&self, user_id: &str) -> Result<Employee, StoreError> {
        self.inner.resolve_role(user_id).await
    }

    async fn conditional_update(
        &self,
        row: RowId,
        _edit: &TaskEdit,
        _expected_version: u64,
        _modified_by: &str,
    ) -> Result<u64, StoreError> {
        Err(self.mode.to_error(row))
    }

    async fn update_priorities(
        &self,
        changes: &[PriorityChange],
        _modified_by: &str,
    ) -> Result<Vec<(RowId, u64)>, StoreError> {
        let row = changes.first().map_or(RowId::new(0), |c| c.row);
        Err(self.mode.to_error(row))
    }

    async fn append(&self, _draft: &TaskDraft, _priority: u32) -> Result<Task, StoreError> {
        Err(self.mode.to_error(RowId::new(0)))
    }
}

// ---------------------------------------------------------------------------
// Version conflicts between two sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_edit_conflicts_and_requires_reload() {
    let store = MemStore::with_tasks(vec![make_task(1, TaskStatus::Queued, 1)], employees());
    let mut alice = Session::open(store.clone(), LogNotifier, "2").await.unwrap();
    let mut olga = Session::open(store.clone(), LogNotifier, "1").await.unwrap();

    // Alice commits first.
    alice.save_edit(&key(1), make_edit("alice version")).await.unwrap();

    // Olga still holds version 0 — her edit must conflict, not merge.
    let before = olga.board().task(&key(1)).unwrap().clone();
    let err = olga
        .save_edit(&key(1), make_edit("olga version"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MutationError::Conflict {
            expected: 0,
            actual: 1,
            ..
        }
    ));

    // The local mutation was rolled back exactly.
    assert_eq!(olga.board().task(&key(1)).unwrap(), &before);
    assert!(olga.is_stale());

    // Alice's committed edit survives untouched in the store.
    let stored = &store.load_all().await.unwrap().tasks[0];
    assert_eq!(stored.name, "alice version");
    assert_eq!(stored.version, 1);

    // After a reload, Olga sees Alice's data and can edit again.
    olga.reload().await.unwrap();
    assert!(!olga.is_stale());
    assert_eq!(olga.board().task(&key(1)).unwrap().name, "alice version");
    olga.save_edit(&key(1), make_edit("olga version")).await.unwrap();
    assert_eq!(store.load_all().await.unwrap().tasks[0].version, 2);
}

#[tokio::test]
async fn stale_session_refuses_every_mutation() {
    let store = MemStore::with_tasks(
        vec![
            make_task(1, TaskStatus::Queued, 1),
            make_task(2, TaskStatus::Queued, 2),
        ],
        employees(),
    );
    let mut alice = Session::open(store.clone(), LogNotifier, "2").await.unwrap();
    let mut olga = Session::open(store.clone(), LogNotifier, "1").await.unwrap();

    alice.save_edit(&key(1), make_edit("first")).await.unwrap();
    let _ = olga.save_edit(&key(1), make_edit("loser")).await.unwrap_err();
    assert!(olga.is_stale());

    assert!(matches!(
        olga.change_status(&key(2), TaskStatus::Done).await,
        Err(MutationError::StaleSession)
    ));
    assert!(matches!(
        olga.reorder(TaskStatus::Queued, &[key(2), key(1)]).await,
        Err(MutationError::StaleSession)
    ));
    assert!(matches!(
        olga.create(TaskDraft {
            name: "blocked".to_string(),
            message: None,
            status: TaskStatus::Queued,
            project: "Atlas".to_string(),
            responsible: vec![],
        })
        .await,
        Err(MutationError::StaleSession)
    ));
}

#[tokio::test]
async fn reorder_racing_an_edit_conflicts_atomically() {
    let store = MemStore::with_tasks(
        vec![
            make_task(1, TaskStatus::Queued, 1),
            make_task(2, TaskStatus::Queued, 2),
        ],
        employees(),
    );
    let mut alice = Session::open(store.clone(), LogNotifier, "2").await.unwrap();
    let mut olga = Session::open(store.clone(), LogNotifier, "1").await.unwrap();

    // Alice edits row 2; its version moves to 1.
    alice.save_edit(&key(2), make_edit("edited meanwhile")).await.unwrap();

    // Olga reorders the group using her stale row-2 version. The batch
    // path carries expected versions, so this conflicts instead of
    // silently clobbering Alice's edit.
    let err = olga
        .reorder(TaskStatus::Queued, &[key(2), key(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Conflict { .. }));
    assert!(olga.is_stale());

    // Nothing moved in the store, and Alice's edit is intact.
    let snapshot = store.load_all().await.unwrap();
    let stored = snapshot.tasks.iter().find(|t| t.key == key(2)).unwrap();
    assert_eq!(stored.name, "edited meanwhile");
    assert_eq!(stored.priority, 2);
    // Olga's local order was rolled back too.
    assert_eq!(olga.board().task(&key(1)).unwrap().priority, 1);
    assert_eq!(olga.board().task(&key(2)).unwrap().priority, 2);
}

// ---------------------------------------------------------------------------
// Rollback on transport-class failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_change_rolls_back_exactly_on_transport_error() {
    let inner = MemStore::with_tasks(
        vec![
            make_task(1, TaskStatus::InProgress, 1),
            make_task(2, TaskStatus::InProgress, 2),
        ],
        employees(),
    );
    let store = FlakyStore::new(inner, FailMode::Transport);
    let mut session = Session::open(store, LogNotifier, "2").await.unwrap();

    let before: Vec<Task> = {
        let mut tasks: Vec<Task> = session.board().tasks().cloned().collect();
        tasks.sort_by(|a, b| a.key.cmp(&b.key));
        tasks
    };

    let err = session
        .change_status(&key(1), TaskStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Transport(_)));

    let after: Vec<Task> = {
        let mut tasks: Vec<Task> = session.board().tasks().cloned().collect();
        tasks.sort_by(|a, b| a.key.cmp(&b.key));
        tasks
    };
    assert_eq!(before, after);

    // A transport failure does not latch the session stale.
    assert!(!session.is_stale());
}

#[tokio::test]
async fn edit_rolls_back_exactly_on_transport_error() {
    let inner = MemStore::with_tasks(vec![make_task(1, TaskStatus::Queued, 1)], employees());
    let store = FlakyStore::new(inner, FailMode::Transport);
    let mut session = Session::open(store, LogNotifier, "2").await.unwrap();

    let before = session.board().task(&key(1)).unwrap().clone();
    let err = session
        .save_edit(&key(1), make_edit("never lands"))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Transport(_)));
    assert_eq!(session.board().task(&key(1)).unwrap(), &before);
}

#[tokio::test]
async fn reorder_rolls_back_exactly_on_timeout() {
    let inner = MemStore::with_tasks(
        vec![
            make_task(1, TaskStatus::Queued, 1),
            make_task(2, TaskStatus::Queued, 2),
        ],
        employees(),
    );
    let store = FlakyStore::new(inner, FailMode::Timeout);
    let mut session = Session::open(store, LogNotifier, "2").await.unwrap();

    let err = session
        .reorder(TaskStatus::Queued, &[key(2), key(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Timeout));

    assert_eq!(session.board().task(&key(1)).unwrap().priority, 1);
    assert_eq!(session.board().task(&key(2)).unwrap().priority, 2);
}

#[tokio::test]
async fn vanished_row_surfaces_not_found_and_rolls_back() {
    let inner = MemStore::with_tasks(vec![make_task(1, TaskStatus::Queued, 1)], employees());
    let store = FlakyStore::new(inner, FailMode::NotFound);
    let mut session = Session::open(store, LogNotifier, "2").await.unwrap();

    let before = session.board().task(&key(1)).unwrap().clone();
    let err = session
        .save_edit(&key(1), make_edit("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::NotFound(row) if row == RowId::new(1)));
    assert_eq!(session.board().task(&key(1)).unwrap(), &before);
}

// ---------------------------------------------------------------------------
// Optimistic create removal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_create_leaves_no_trace_in_any_projection() {
    let inner = MemStore::with_tasks(vec![make_task(1, TaskStatus::Queued, 1)], employees());
    let store = FlakyStore::new(inner, FailMode::Transport);
    let mut session = Session::open(store, LogNotifier, "2").await.unwrap();

    let err = session
        .create(TaskDraft {
            name: "doomed".to_string(),
            message: None,
            status: TaskStatus::Queued,
            project: "Atlas".to_string(),
            responsible: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Transport(_)));

    // The temporary task is gone from the board and every projection.
    assert_eq!(session.board().len(), 1);
    let view = session.view();
    let all_names: Vec<&str> = view
        .views
        .iter()
        .flat_map(|v| &v.groups)
        .flat_map(|g| &g.tasks)
        .map(|t| t.name.as_str())
        .collect();
    assert!(!all_names.contains(&"doomed"));
}

// ---------------------------------------------------------------------------
// The happy single-row edit path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_edit_adopts_new_version_and_audit() {
    let store = MemStore::with_tasks(vec![make_task(1, TaskStatus::Queued, 1)], employees());
    let mut session = Session::open(store.clone(), LogNotifier, "2").await.unwrap();

    session.save_edit(&key(1), make_edit("renamed")).await.unwrap();

    let local = session.board().task(&key(1)).unwrap();
    assert_eq!(local.name, "renamed");
    assert_eq!(local.message.as_deref(), Some("edited note"));
    assert_eq!(local.responsible, vec!["Olga".to_string()]);
    assert_eq!(local.version, 1);
    assert_eq!(local.modified_by.as_deref(), Some("Alice"));

    let stored = &store.load_all().await.unwrap().tasks[0];
    assert_eq!(stored.name, "renamed");
    assert_eq!(stored.version, 1);
    // Edits never touch status or priority.
    assert_eq!(stored.status, TaskStatus::Queued);
    assert_eq!(stored.priority, 1);
}

#[tokio::test]
async fn edit_with_unknown_responsible_is_rejected_untouched() {
    let store = MemStore::with_tasks(vec![make_task(1, TaskStatus::Queued, 1)], employees());
    let mut session = Session::open(store.clone(), LogNotifier, "2").await.unwrap();

    let before = session.board().task(&key(1)).unwrap().clone();
    let edit = TaskEdit {
        name: "fine".to_string(),
        message: None,
        responsible: vec!["Stranger".to_string()],
    };
    let err = session.save_edit(&key(1), edit).await.unwrap_err();
    assert!(matches!(err, MutationError::Rejected(_)));

    assert_eq!(session.board().task(&key(1)).unwrap(), &before);
    assert_eq!(store.load_all().await.unwrap().tasks[0].version, 0);
}
