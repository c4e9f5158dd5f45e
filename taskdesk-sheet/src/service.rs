//! WebSocket endpoint for the sheet service.
//!
//! Clients connect to `/ws` and exchange postcard-encoded
//! [`StoreRequest`] / [`StoreReply`] frames. Each connection is handled
//! independently; all connections share one [`SheetStore`]. Malformed
//! frames are logged and skipped — a bad client cannot take the service
//! down, and the connection stays usable.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use taskdesk_proto::codec;
use taskdesk_proto::store::{StoreFault, StoreOk, StoreOp, StoreReply};

use crate::store::SheetStore;

/// Shared service state.
#[derive(Default)]
pub struct SheetState {
    /// The authoritative row store.
    pub store: SheetStore,
}

impl SheetState {
    /// Creates service state around an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates service state around a pre-seeded store.
    #[must_use]
    pub fn with_store(store: SheetStore) -> Self {
        Self { store }
    }
}

/// Handles one upgraded WebSocket connection.
///
/// Reads binary frames, dispatches each decoded request against the store,
/// and writes the reply. The loop ends when the client closes the
/// connection or the socket errors out.
pub async fn handle_socket(socket: WebSocket, state: Arc<SheetState>) {
    let (mut sender, mut receiver) = socket.split();
    tracing::info!("client connected");

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => {
                let request = match codec::decode_request(&data) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(err = %e, "malformed request frame, skipping");
                        continue;
                    }
                };

                let reply = StoreReply {
                    request_id: request.request_id,
                    result: dispatch(&state.store, request.op).await,
                };
                match codec::encode_reply(&reply) {
                    Ok(bytes) => {
                        if let Err(e) = sender.send(Message::Binary(bytes.into())).await {
                            tracing::warn!(err = %e, "failed to send reply, closing");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(err = %e, "failed to encode reply");
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::info!("client closed connection");
                break;
            }
            Ok(_) => {
                // Ping/pong/text frames are not part of the protocol.
            }
            Err(e) => {
                tracing::warn!(err = %e, "socket read error");
                break;
            }
        }
    }
    tracing::info!("connection handler exiting");
}

/// Executes one store operation.
async fn dispatch(store: &SheetStore, op: StoreOp) -> Result<StoreOk, StoreFault> {
    match op {
        StoreOp::LoadAll => {
            let (tasks, employees) = store.load_all().await;
            Ok(StoreOk::Snapshot { tasks, employees })
        }
        StoreOp::ResolveRole { user_id } => {
            let employee = store.resolve_role(&user_id).await?;
            Ok(StoreOk::Role { employee })
        }
        StoreOp::Update {
            row,
            edit,
            expected_version,
            modified_by,
        } => {
            let new_version = store
                .conditional_update(row, &edit, expected_version, &modified_by)
                .await?;
            Ok(StoreOk::Updated { row, new_version })
        }
        StoreOp::UpdatePriorities {
            changes,
            modified_by,
        } => {
            let rows = store.update_priorities(&changes, &modified_by).await?;
            Ok(StoreOk::PrioritiesUpdated { rows })
        }
        StoreOp::Append { draft, priority } => {
            let task = store.append(&draft, priority).await?;
            Ok(StoreOk::Appended { task })
        }
    }
}

/// Starts the sheet service on the given address with an empty store.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(SheetState::new())).await
}

/// Starts the sheet service with pre-configured state.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<SheetState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "sheet service error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<SheetState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
