//! WebSocket observer transport.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::warn;

use crate::app::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

/// One observer connection: drain the hub's outbound queue into the socket
/// and feed inbound text frames back through the hub. A malformed inbound
/// payload is dropped; the connection stays open.
async fn client_loop(socket: WebSocket, state: AppState) {
    let (id, mut outbound) = state.hub.register().await;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                match queued {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Hub shut down; close out.
                    None => break,
                }
            }
            inbound = stream.next() => {
                let Some(Ok(message)) = inbound else {
                    break;
                };
                match message {
                    Message::Text(text) => {
                        if let Err(err) = state.hub.publish(&text).await {
                            warn!(connection = id, error = %err, "dropping inbound payload");
                        }
                    }
                    Message::Binary(_) => {
                        warn!(connection = id, "binary frames unsupported; ignoring");
                    }
                    Message::Ping(payload) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }

    state.hub.unregister(id).await;
}
