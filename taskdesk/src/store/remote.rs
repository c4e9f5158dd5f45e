//! WebSocket row store speaking the sheet service protocol.
//!
//! [`RemoteStore`] holds one WebSocket connection to a sheet service and
//! performs request/reply calls over it: each request carries a UUID v7
//! `request_id`, and the store reads frames until the matching reply
//! arrives. Requests are serialized behind a mutex — the mutation protocol
//! issues one store call per mutation, so there is nothing to pipeline.
//!
//! Every call is bounded by a per-request timeout (default 15 s); an
//! expired call surfaces as [`StoreError::Timeout`] and is treated by the
//! caller like any other transport failure.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use taskdesk_proto::codec;
use taskdesk_proto::employee::Employee;
use taskdesk_proto::store::{PriorityChange, StoreOk, StoreOp, StoreRequest};
use taskdesk_proto::task::{RowId, Task, TaskDraft, TaskEdit};

use super::{RowStore, Snapshot, StoreError};

/// Type alias for the underlying WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Default timeout for establishing the WebSocket connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout; a hanging store call fails after this.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// WebSocket-backed [`RowStore`] implementation.
#[derive(Debug)]
pub struct RemoteStore {
    ws: Mutex<WsStream>,
    request_timeout: Duration,
    url: String,
}

impl RemoteStore {
    /// Connects to a sheet service with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the connection attempt times out,
    /// or [`StoreError::Transport`] if it fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_timeouts(url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Connects to a sheet service with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the connection attempt times out,
    /// or [`StoreError::Transport`] if it fails.
    pub async fn connect_with_timeouts(
        url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let (ws, _response) = tokio::time::timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "sheet service connect timed out");
                StoreError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "sheet service connect failed");
                StoreError::Transport(format!("connect failed: {e}"))
            })?;

        tracing::info!(url, "connected to sheet service");
        Ok(Self {
            ws: Mutex::new(ws),
            request_timeout,
            url: url.to_string(),
        })
    }

    /// The service URL this store is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one request and reads frames until the matching reply arrives.
    async fn call(&self, op: StoreOp) -> Result<StoreOk, StoreError> {
        let request = StoreRequest {
            request_id: Uuid::now_v7(),
            op,
        };
        let bytes = codec::encode_request(&request)
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let mut ws = self.ws.lock().await;
        tokio::time::timeout(self.request_timeout, async {
            ws.send(Message::Binary(bytes.into()))
                .await
                .map_err(|e| StoreError::Transport(format!("send failed: {e}")))?;

            loop {
                match ws.next().await {
                    Some(Ok(Message::Binary(data))) => match codec::decode_reply(&data) {
                        Ok(reply) if reply.request_id == request.request_id => {
                            return reply.result.map_err(StoreError::from);
                        }
                        Ok(reply) => {
                            tracing::debug!(
                                request_id = %reply.request_id,
                                "skipping reply for another request"
                            );
                        }
                        Err(e) => {
                            // Malformed frame — log and keep reading.
                            tracing::warn!(err = %e, "malformed reply frame, skipping");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(StoreError::Transport(
                            "sheet service closed the connection".to_string(),
                        ));
                    }
                    Some(Ok(_)) => {
                        // Ping/pong/text frames are not part of the protocol.
                    }
                    Some(Err(e)) => {
                        return Err(StoreError::Transport(format!("read failed: {e}")));
                    }
                }
            }
        })
        .await
        .map_err(|_| {
            tracing::warn!(url = %self.url, "store request timed out");
            StoreError::Timeout
        })?
    }
}

impl RowStore for RemoteStore {
    async fn load_all(&self) -> Result<Snapshot, StoreError> {
        match self.call(StoreOp::LoadAll).await? {
            StoreOk::Snapshot { tasks, employees } => Ok(Snapshot { tasks, employees }),
            other => Err(unexpected_reply("Snapshot", &other)),
        }
    }

    async fn resolve_role(&self, user_id: &str) -> Result<Employee, StoreError> {
        let op = StoreOp::ResolveRole {
            user_id: user_id.to_string(),
        };
        match self.call(op).await? {
            StoreOk::Role { employee } => Ok(employee),
            other => Err(unexpected_reply("Role", &other)),
        }
    }

    async fn conditional_update(
        &self,
        row: RowId,
        edit: &TaskEdit,
        expected_version: u64,
        modified_by: &str,
    ) -> Result<u64, StoreError> {
        let op = StoreOp::Update {
            row,
            edit: edit.clone(),
            expected_version,
            modified_by: modified_by.to_string(),
        };
        match self.call(op).await? {
            StoreOk::Updated { new_version, .. } => Ok(new_version),
            other => Err(unexpected_reply("Updated", &other)),
        }
    }

    async fn update_priorities(
        &self,
        changes: &[PriorityChange],
        modified_by: &str,
    ) -> Result<Vec<(RowId, u64)>, StoreError> {
        let op = StoreOp::UpdatePriorities {
            changes: changes.to_vec(),
            modified_by: modified_by.to_string(),
        };
        match self.call(op).await? {
            StoreOk::PrioritiesUpdated { rows } => Ok(rows),
            other => Err(unexpected_reply("PrioritiesUpdated", &other)),
        }
    }

    async fn append(&self, draft: &TaskDraft, priority: u32) -> Result<Task, StoreError> {
        let op = StoreOp::Append {
            draft: draft.clone(),
            priority,
        };
        match self.call(op).await? {
            StoreOk::Appended { task } => Ok(task),
            other => Err(unexpected_reply("Appended", &other)),
        }
    }
}

/// A reply variant that does not match the request is a protocol breach.
fn unexpected_reply(expected: &str, got: &StoreOk) -> StoreError {
    tracing::warn!(expected, ?got, "unexpected store reply variant");
    StoreError::Transport(format!("unexpected reply (wanted {expected})"))
}
