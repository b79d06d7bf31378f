use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    services::event_service,
    state::{SessionHandle, SharedState},
};

/// Handle the full lifecycle for an individual client WebSocket connection.
///
/// The hub receives the only sender for the session's outbound queue, so
/// unregistration (voluntary or forced by overflow) closes the queue and ends
/// the writer task.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<Message>(state.config().session_queue_capacity);

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                return;
            }
        }
        // Queue closed by the hub; send a close frame before dropping the sink.
        let _ = sender.send(Message::Close(None)).await;
    });

    let session_id = Uuid::new_v4();
    state
        .hub()
        .register(SessionHandle {
            id: session_id,
            tx: outbound_tx,
        })
        .await;
    let sessions = state.hub().session_count().await;
    info!(id = %session_id, sessions, "session connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                event_service::dispatch(&state, text.as_str()).await;
            }
            Ok(Message::Close(_)) => {
                debug!(id = %session_id, "session closed by peer");
                break;
            }
            // Pings are answered by the protocol layer; binary frames carry
            // nothing we understand.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
            Err(err) => {
                warn!(id = %session_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.hub().unregister(session_id).await;
    let sessions = state.hub().session_count().await;
    info!(id = %session_id, sessions, "session disconnected");

    finalize(writer_task).await;
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>) {
    let _ = writer_task.await;
}
