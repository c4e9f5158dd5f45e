//! A user's board session.
//!
//! [`Session`] ties together the resolved identity, the view scope, the
//! owned board state, the row store, and the notifier. Opening a session
//! resolves the user's role first (unknown users are rejected), then loads
//! the full board. The mutation protocol itself lives in
//! [`crate::mutation`] as further `impl Session` blocks.

use taskdesk_proto::employee::Employee;

use crate::board::Board;
use crate::notify::Notifier;
use crate::project::{ProjectedBoard, project};
use crate::scope::ViewScope;
use crate::store::{RowStore, StoreError};

/// Errors that can occur while opening or reloading a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The chat identity is not a registered employee.
    #[error("unauthorized: user {0} is not a registered employee")]
    Unauthorized(String),
    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One user's live view of the shared board.
#[derive(Debug)]
pub struct Session<S, N> {
    pub(crate) board: Board,
    pub(crate) scope: ViewScope,
    pub(crate) user: Employee,
    pub(crate) store: S,
    pub(crate) notifier: N,
    /// Set after a version conflict; cleared by [`Session::reload`].
    pub(crate) stale: bool,
}

impl<S: RowStore, N: Notifier> Session<S, N> {
    /// Opens a session: resolves the user's role, loads the board, and
    /// computes the view scope.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unauthorized`] if the user is not a
    /// registered employee, or [`SessionError::Store`] if the store cannot
    /// be read.
    pub async fn open(store: S, notifier: N, user_id: &str) -> Result<Self, SessionError> {
        let user = store.resolve_role(user_id).await.map_err(|e| match e {
            StoreError::Unauthorized(id) => SessionError::Unauthorized(id),
            other => SessionError::Store(other),
        })?;
        let snapshot = store.load_all().await?;
        let scope = ViewScope::for_user(&user);

        tracing::info!(
            user = %user.name,
            role = %user.role,
            tasks = snapshot.tasks.len(),
            "session opened"
        );

        Ok(Self {
            board: Board::new(snapshot.tasks, snapshot.employees),
            scope,
            user,
            store,
            notifier,
            stale: false,
        })
    }

    /// Replaces the board with a fresh store snapshot and clears the stale
    /// latch set by a version conflict.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store cannot be read; the
    /// session stays stale in that case.
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        let snapshot = self.store.load_all().await?;
        self.board = Board::new(snapshot.tasks, snapshot.employees);
        self.stale = false;
        tracing::info!(tasks = self.board.len(), "board reloaded");
        Ok(())
    }

    /// Derives the presentation list for this session's scope.
    #[must_use]
    pub fn view(&self) -> ProjectedBoard {
        project(&self.board, &self.scope)
    }

    /// Read access to the board state.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The resolved employee record for this session.
    #[must_use]
    pub fn user(&self) -> &Employee {
        &self.user
    }

    /// The session's view scope.
    #[must_use]
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// The session's notifier (e.g. to drain a queueing implementation).
    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Returns `true` after a version conflict, until [`Session::reload`]
    /// succeeds. A stale session refuses further mutations.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }
}
