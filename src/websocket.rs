//! WebSocket server handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::AppState;

/// Capacity of each connection's outbound queue
const OUTBOX_CAPACITY: usize = 256;

/// WebSocket handler
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    if let Err(e) = state.router.connect(connection_id, outbox_tx).await {
        tracing::error!(%connection_id, "Failed to register connection: {}", e);
        return;
    }
    tracing::info!(%connection_id, "Client connected");

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::error!(%connection_id, "WebSocket error: {}", e);
                        break;
                    }
                };

                let message = match parse_message(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(%connection_id, "Ignoring message: {}", e);
                        continue;
                    }
                };

                if state.router.message(connection_id, message).await.is_err() {
                    tracing::error!(%connection_id, "Router stopped, closing connection");
                    break;
                }
            }
            Some(outgoing) = outbox_rx.recv() => {
                let json = match serde_json::to_string(&outgoing) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(%connection_id, "Failed to encode message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(json)).await {
                    tracing::debug!(%connection_id, "Failed to send: {}", e);
                    break;
                }
            }
        }
    }

    if let Err(e) = state.router.disconnect(connection_id).await {
        tracing::error!(%connection_id, "Failed to unregister connection: {}", e);
    }
    tracing::info!(%connection_id, "Client disconnected");
}

fn parse_message(text: &str) -> crate::error::Result<ClientMessage> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_parse_message_valid() {
        let msg = parse_message(r#"{"type":"history:redo"}"#).unwrap();
        assert_eq!(msg, ClientMessage::HistoryRedo);
    }

    #[test]
    fn test_parse_message_malformed() {
        assert!(matches!(parse_message("{"), Err(AppError::Protocol(_))));
        assert!(matches!(
            parse_message(r#"{"type":"stroke:chunk","points":"nope"}"#),
            Err(AppError::Protocol(_))
        ));
    }
}
