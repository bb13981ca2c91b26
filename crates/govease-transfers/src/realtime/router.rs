use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use super::registry::ConnectionRegistry;

/// Router exposing the live notification channel. Clients open one socket
/// per session keyed by their citizen id; the server pushes JSON-shaped
/// notification events and tolerates client keepalive messages.
pub fn realtime_router(registry: Arc<ConnectionRegistry>) -> Router {
    Router::new()
        .route("/ws/notifications", get(subscribe_handler))
        .with_state(registry)
}

#[derive(Debug, Deserialize)]
struct SubscribeParams {
    citizen_id: String,
}

async fn subscribe_handler(
    State(registry): State<Arc<ConnectionRegistry>>,
    Query(params): Query<SubscribeParams>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| serve_connection(registry, params.citizen_id, socket))
}

/// Forwards pushed payloads to the socket until either side disconnects,
/// then unregisters the channel.
async fn serve_connection(
    registry: Arc<ConnectionRegistry>,
    citizen_id: String,
    mut socket: WebSocket,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let channel_id = registry.register(&citizen_id, tx);
    debug!(%citizen_id, "live channel opened");

    loop {
        let event = tokio::select! {
            pushed = rx.recv() => Event::Push(pushed),
            incoming = socket.recv() => Event::Incoming(incoming),
        };
        match event {
            Event::Push(Some(payload)) => {
                if socket.send(Message::Text(payload.to_string())).await.is_err() {
                    break;
                }
            }
            // The sending half was dropped, which only happens on shutdown.
            Event::Push(None) => break,
            // Keepalive pings and any client text are ignored.
            Event::Incoming(Some(Ok(Message::Text(_))))
            | Event::Incoming(Some(Ok(Message::Ping(_))))
            | Event::Incoming(Some(Ok(Message::Pong(_))))
            | Event::Incoming(Some(Ok(Message::Binary(_)))) => {}
            Event::Incoming(Some(Ok(Message::Close(_))))
            | Event::Incoming(Some(Err(_)))
            | Event::Incoming(None) => break,
        }
    }

    registry.unregister(&citizen_id, channel_id);
    debug!(%citizen_id, "live channel closed");
}

enum Event {
    Push(Option<serde_json::Value>),
    Incoming(Option<Result<Message, axum::Error>>),
}
