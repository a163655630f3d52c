//! WebSocket adapter for the subscription server.
//!
//! # Data Flow
//! ```text
//! client frames → reader loop → ClientEvent → SubscriptionServer
//! SubscriptionServer / topic controllers → ClientHandle → writer task → client frames
//! ```
//!
//! One writer task per socket drains the connection's outbound channel, so
//! controller timers never touch the socket directly.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::http::server::AppState;
use crate::realtime::{ClientEvent, ClientHandle, ConnectionId, Outbound, ServerEvent, SubscriptionServer};

/// Time allowed for queued frames to flush after the session ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.subscriptions))
}

/// Run one client session until either side closes.
pub async fn handle_socket(socket: WebSocket, server: Arc<SubscriptionServer>) {
    let (handle, mut outbound) = ClientHandle::channel();
    let id = handle.id();
    let reply = handle.clone();
    server.connect(handle);

    let (mut sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            match message {
                Outbound::Event(event) => {
                    let frame = match event.to_json() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(connection_id = %id, error = %e, "Event serialization failed");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut closed = server.closed();
    let mut writer_done = false;
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => on_text(&server, &reply, id, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    server.transport_error(id, &e);
                    break;
                }
            },
            _ = closed.recv() => break,
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    server.disconnect(id);
    drop(reply);
    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
}

fn on_text(server: &SubscriptionServer, reply: &ClientHandle, id: ConnectionId, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(connection_id = %id, error = %e, "Malformed client frame");
            reply.emit(ServerEvent::error("", format!("Malformed event: {e}")));
            return;
        }
    };

    if let Err(e) = server.handle_event(id, event) {
        tracing::debug!(connection_id = %id, error = %e, "Client event rejected");
    }
}
