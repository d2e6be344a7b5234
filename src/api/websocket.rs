//! WebSocket handler for the real-time push channel

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tracing::{debug, info};

use crate::api::state::ApiState;

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Forward broadcaster frames to one client until either side goes away
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let (mut sender, mut receiver) = socket.split();

    // The greeting is already queued on the observer channel
    let mut observer = state.broadcaster.register().await;
    let observer_id = observer.id;
    info!(observer = observer_id, "WebSocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = observer.frames.recv().await {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Observers only listen; anything they send besides Close is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Ping(_) => {
                    // Pong is automatically sent by axum
                    debug!("Received ping");
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.broadcaster.unregister(observer_id).await;
    info!(observer = observer_id, "WebSocket client disconnected");
}
