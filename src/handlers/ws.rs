//! WebSocket handler
//!
//! One long-lived connection per subscriber. The receive loop suspends on
//! the next control message or the idle timeout; timeout expiry is itself
//! an event (emit keepalive), not an error. Outbound traffic flows through
//! the hub's per-connection queue so broadcasts never block on a socket.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;

use crate::middleware::auth::MaybeIdentity;
use crate::realtime::{ControlMessage, Envelope};
use crate::AppState;

pub async fn connect(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = identity.map(|i| i.user_id);
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
}

async fn handle_socket(state: AppState, user_id: Option<String>, socket: WebSocket) {
    let (connection_id, mut outbound) = state.hub.connect(user_id, &[]);
    let (mut sink, mut stream) = socket.split();

    // greeting goes through the queue so ordering matches later traffic
    state.hub.send(
        &connection_id,
        Envelope::new("connected").with_data(json!({
            "connection_id": connection_id,
            "message": "Connected to Grid-Shield real-time stream",
        })),
    );

    // writer task: drain the outbound queue onto the socket
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let idle = Duration::from_secs(state.config.ws_idle_timeout_secs);
    loop {
        match tokio::time::timeout(idle, stream.next()).await {
            Err(_) => {
                // idle: keep the connection warm
                if !state.hub.send(&connection_id, Envelope::new("keepalive")) {
                    break;
                }
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                state.hub.touch(&connection_id);
                handle_control(&state, &connection_id, &text);
            }
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(_))) => {} // binary/ping/pong frames are ignored
        }
    }

    state.hub.disconnect(&connection_id);
    writer.abort();

    tracing::info!(%connection_id, "websocket closed");
}

fn handle_control(state: &AppState, connection_id: &str, text: &str) {
    match serde_json::from_str::<ControlMessage>(text) {
        Ok(ControlMessage::Ping) => {
            state.hub.send(connection_id, Envelope::new("pong"));
        }
        Ok(ControlMessage::Subscribe { channels }) => {
            state.hub.subscribe(connection_id, &channels);
            state.hub.send(
                connection_id,
                Envelope::new("subscribed").with_data(json!({ "channels": channels })),
            );
        }
        Ok(ControlMessage::Unsubscribe { channels }) => {
            state.hub.unsubscribe(connection_id, &channels);
            state.hub.send(
                connection_id,
                Envelope::new("unsubscribed").with_data(json!({ "channels": channels })),
            );
        }
        Err(err) => {
            state.hub.send(
                connection_id,
                Envelope::new("error")
                    .with_data(json!({ "message": format!("Unsupported message: {}", err) })),
            );
        }
    }
}
