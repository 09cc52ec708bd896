//! WebSocket client for a Sketchroom server

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::messages::{ClientMessage, Point, ServerMessage, Style, User, UserProfile};
use crate::reconstruct::ChunkKind;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// WebSocket client for Sketchroom
pub struct SketchClient {
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<ServerMessage>,
    #[allow(dead_code)]
    handle: tokio::task::JoinHandle<()>,
}

impl SketchClient {
    /// Connect to a Sketchroom server
    pub async fn connect(url: &str) -> Result<Self> {
        tracing::info!("Connecting to {}", url);

        let (ws_stream, _) = connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Channel for outgoing messages
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(256);

        // Channel for incoming parsed messages
        let (in_tx, in_rx) = mpsc::channel::<ServerMessage>(256);

        // Spawn task to handle WebSocket communication
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Handle outgoing messages
                    Some(msg) = out_rx.recv() => {
                        if write.send(msg).await.is_err() {
                            break;
                        }
                    }
                    // Handle incoming messages
                    Some(result) = read.next() => {
                        match result {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<ServerMessage>(&text) {
                                    Ok(msg) => {
                                        if in_tx.send(msg).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse message: {} - {}", e, text);
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Err(e) => {
                                tracing::error!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    else => break,
                }
            }
        });

        tracing::info!("Connected successfully");

        Ok(Self {
            tx: out_tx,
            rx: in_rx,
            handle,
        })
    }

    /// Send a message to the server
    async fn send(&self, msg: ClientMessage) -> Result<()> {
        let json = serde_json::to_string(&msg)?;
        self.tx
            .send(Message::Text(json))
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Receive a message from the server
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.rx.recv().await
    }

    /// Try to receive a message without blocking
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.rx.try_recv().ok()
    }

    /// Join a room and wait for its member list. Returns the resolved room id.
    pub async fn join(&mut self, room_id: Option<String>, user: UserProfile) -> Result<(String, Vec<User>)> {
        self.send(ClientMessage::RoomJoin { room_id, user }).await?;

        while let Some(msg) = self.recv().await {
            if let ServerMessage::RoomInit { room_id, users, .. } = msg {
                return Ok((room_id, users));
            }
        }

        Err(ClientError::Closed)
    }

    /// Send one batch of points for the current stroke
    pub async fn send_chunk(&self, points: Vec<Point>, style: Style, kind: ChunkKind) -> Result<()> {
        let msg = match kind {
            ChunkKind::Stroke => ClientMessage::StrokeChunk { points, style },
            ChunkKind::Erase => ClientMessage::EraseChunk { points, style },
        };
        self.send(msg).await
    }

    pub async fn end_stroke(&self) -> Result<()> {
        self.send(ClientMessage::StrokeEnd {
            ts: chrono::Utc::now().timestamp_millis(),
        })
        .await
    }

    pub async fn cursor(&self, at: Point) -> Result<()> {
        self.send(ClientMessage::Cursor { x: at.x, y: at.y }).await
    }

    pub async fn undo(&self) -> Result<()> {
        self.send(ClientMessage::HistoryUndo).await
    }

    pub async fn redo(&self) -> Result<()> {
        self.send(ClientMessage::HistoryRedo).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.send(ClientMessage::PingLatency).await
    }

    /// Listen for events until callback returns false
    pub async fn listen<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(ServerMessage) -> bool,
    {
        while let Some(msg) = self.recv().await {
            if !callback(msg) {
                break;
            }
        }
        Ok(())
    }
}
