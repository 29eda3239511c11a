//! WebSocket connection handlers.
//!
//! Each socket runs as two tasks: a reader that feeds frames to the router in
//! arrival order, and a pusher that drains the connection's outbound queue.
//! Whichever finishes first aborts the other, and a terminated connection
//! aborts both.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};

use crate::{
    domain::{Connection, InboundFrame, OutboundFrame, OutboundReceiver},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(state.max_message_size)
        .max_frame_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that drains `rx` into the WebSocket sink.
///
/// A [`OutboundFrame::Close`] sends a close frame and ends the task, which in
/// turn tears down the reader.
fn pusher_loop(
    mut rx: OutboundReceiver,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let message = match frame {
                OutboundFrame::Text(text) => Message::Text(text.into()),
                OutboundFrame::Ping => Message::Ping(Bytes::new()),
                OutboundFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (connection, rx) = Connection::new(state.clock.now_millis());
    state.registry.attach(connection.clone()).await;
    tracing::info!(connection_id = %connection.id(), "Client connected");

    let (sender, mut receiver) = socket.split();

    let reader_state = state.clone();
    let reader_connection = connection.clone();

    // Spawn a task to receive frames from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(connection_id = %reader_connection.id(), "WebSocket error: {}", e);
                    break;
                }
            };

            let frame = match &msg {
                Message::Text(text) => InboundFrame::Text(text.as_str()),
                Message::Binary(bytes) => InboundFrame::Binary(&bytes[..]),
                Message::Pong(_) => {
                    reader_connection.mark_alive();
                    continue;
                }
                Message::Ping(_) => {
                    // Answered by the WebSocket protocol layer
                    continue;
                }
                Message::Close(_) => {
                    tracing::info!(connection_id = %reader_connection.id(), "Client requested close");
                    break;
                }
            };

            match reader_state.router.route(&reader_connection, frame).await {
                Ok(outcome) => {
                    tracing::debug!(connection_id = %reader_connection.id(), ?outcome, "Frame routed");
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %reader_connection.id(),
                        error = %e,
                        "Outbound envelope failed validation"
                    );
                }
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other.
    // A terminated connection drops the socket even if the writer is stuck.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
        _ = connection.terminated() => {
            tracing::info!(connection_id = %connection.id(), "Connection terminated, dropping socket");
            recv_task.abort();
            send_task.abort();
        }
    };

    connection.terminate();
    state.registry.unregister(&connection).await;
    tracing::info!(connection_id = %connection.id(), "Client disconnected");
}
