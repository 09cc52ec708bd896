//! Broadcast router
//!
//! One task owns the room registry and the table of live connections. Every
//! inbound event (a connection opening, a client message, a disconnect, an
//! expired grace period) is queued and handled to completion before the next
//! one, so room and log mutations never interleave and no locks are needed.
//!
//! Delivery to connections is best-effort: each connection has a bounded
//! outbox and a message is dropped if that outbox is full or closed.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Entry, UserProfile};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{RoomRegistry, RoomSummary};

/// Capacity of the shared inbound event queue
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Events processed by the router task, strictly in arrival order
#[derive(Debug)]
pub enum Event {
    Connected {
        connection_id: Uuid,
        outbox: mpsc::Sender<ServerMessage>,
    },
    Message {
        connection_id: Uuid,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: Uuid,
    },
    Inspect {
        room_id: String,
        reply: oneshot::Sender<Option<RoomSummary>>,
    },
}

struct Connection {
    outbox: mpsc::Sender<ServerMessage>,
    room: Option<String>,
}

/// Routes client events to room logs and fans them out to room members
pub struct BroadcastRouter {
    registry: RoomRegistry,
    connections: HashMap<Uuid, Connection>,
}

impl BroadcastRouter {
    pub fn new(registry: RoomRegistry) -> Self {
        Self {
            registry,
            connections: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Room the connection is currently joined to
    pub fn room_of(&self, connection_id: Uuid) -> Option<&str> {
        self.connections
            .get(&connection_id)
            .and_then(|c| c.room.as_deref())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Connected {
                connection_id,
                outbox,
            } => self.connect(connection_id, outbox),
            Event::Message {
                connection_id,
                message,
            } => self.handle(connection_id, message),
            Event::Disconnected { connection_id } => self.disconnect(connection_id),
            Event::Inspect { room_id, reply } => {
                let _ = reply.send(self.registry.summary(&room_id));
            }
        }
    }

    pub fn connect(&mut self, connection_id: Uuid, outbox: mpsc::Sender<ServerMessage>) {
        self.connections
            .insert(connection_id, Connection { outbox, room: None });
        tracing::debug!(%connection_id, "Connection registered");
    }

    pub fn handle(&mut self, connection_id: Uuid, message: ClientMessage) {
        if !self.connections.contains_key(&connection_id) {
            tracing::warn!(%connection_id, event = message.name(), "Message from unknown connection");
            return;
        }

        match message {
            ClientMessage::RoomJoin { room_id, user } => {
                self.join(connection_id, room_id.as_deref(), user);
            }
            ClientMessage::PingLatency => {
                self.deliver(connection_id, ServerMessage::PongLatency);
            }
            ClientMessage::Cursor { mut payload } => {
                let Some(room_id) = self.room_of(connection_id).map(str::to_owned) else {
                    return;
                };
                payload.remove("id");
                self.broadcast(
                    &room_id,
                    ServerMessage::Cursor {
                        id: connection_id,
                        payload,
                    },
                    Some(connection_id),
                );
            }
            ClientMessage::HistoryUndo => self.navigate_history(connection_id, true),
            ClientMessage::HistoryRedo => self.navigate_history(connection_id, false),
            draw @ (ClientMessage::StrokeChunk { .. }
            | ClientMessage::EraseChunk { .. }
            | ClientMessage::StrokeEnd { .. }) => {
                self.draw(connection_id, draw);
            }
        }
    }

    pub fn disconnect(&mut self, connection_id: Uuid) {
        let Some(connection) = self.connections.remove(&connection_id) else {
            return;
        };
        if let Some(room_id) = connection.room {
            self.leave_room(&room_id, connection_id);
        }
        tracing::debug!(%connection_id, "Connection removed");
    }

    /// Grace period for a room ran out
    pub fn expire(&mut self, room_id: &str) {
        self.registry.expire(room_id);
    }

    fn join(&mut self, connection_id: Uuid, requested: Option<&str>, user: UserProfile) {
        let previous = self
            .connections
            .get_mut(&connection_id)
            .and_then(|c| c.room.take());
        if let Some(previous) = previous {
            self.leave_room(&previous, connection_id);
        }

        let room_id = self.registry.join(requested, connection_id, user.clone());
        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.room = Some(room_id.clone());
        }

        let users = self.registry.list_users(&room_id);
        tracing::info!(%connection_id, room = %room_id, members = users.len(), "Joined room");

        self.deliver(
            connection_id,
            ServerMessage::RoomInit {
                room_id: room_id.clone(),
                users: users.clone(),
                ops: Vec::new(),
            },
        );
        self.broadcast(
            &room_id,
            ServerMessage::UserJoined {
                id: connection_id,
                user,
                users,
            },
            Some(connection_id),
        );
    }

    fn leave_room(&mut self, room_id: &str, connection_id: Uuid) {
        if self.registry.leave(room_id, connection_id).is_none() {
            return;
        }
        tracing::info!(%connection_id, room = %room_id, "Left room");

        let users = self.registry.list_users(room_id);
        self.broadcast(
            room_id,
            ServerMessage::UserLeft {
                id: connection_id,
                users,
            },
            None,
        );
    }

    fn draw(&mut self, connection_id: Uuid, message: ClientMessage) {
        let Some(room_id) = self.room_of(connection_id).map(str::to_owned) else {
            tracing::trace!(%connection_id, event = message.name(), "Ignoring draw outside a room");
            return;
        };
        let Some(op) = message.to_operation() else {
            return;
        };
        if let Err(e) = op.validate() {
            tracing::debug!(%connection_id, error = %e, "Dropping invalid chunk");
            return;
        }

        if let Some(room) = self.registry.room_mut(&room_id) {
            room.log_mut().push(Entry::new(connection_id, op.clone()));
        }
        self.broadcast(&room_id, ServerMessage::relay(connection_id, op), Some(connection_id));
    }

    fn navigate_history(&mut self, connection_id: Uuid, undo: bool) {
        let Some(room_id) = self.room_of(connection_id).map(str::to_owned) else {
            return;
        };
        let Some(room) = self.registry.room_mut(&room_id) else {
            return;
        };

        let log = room.log_mut();
        let changed = if undo { log.undo() } else { log.redo() };
        if !changed {
            tracing::debug!(room = %room_id, undo, "History unchanged");
            return;
        }

        let snapshot = log.snapshot();
        tracing::debug!(room = %room_id, undo, entries = snapshot.entries.len(), "History changed");
        self.broadcast(
            &room_id,
            ServerMessage::HistoryApply {
                entries: snapshot.entries,
            },
            None,
        );
    }

    /// Send to every member of a room, optionally skipping one connection
    fn broadcast(&self, room_id: &str, message: ServerMessage, exclude: Option<Uuid>) {
        let Some(room) = self.registry.room(room_id) else {
            return;
        };
        for member in room.member_ids() {
            if exclude == Some(member) {
                continue;
            }
            self.deliver(member, message.clone());
        }
    }

    fn deliver(&self, connection_id: Uuid, message: ServerMessage) {
        let Some(connection) = self.connections.get(&connection_id) else {
            return;
        };
        match connection.outbox.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%connection_id, "Outbox full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(%connection_id, "Outbox closed, dropping message");
            }
        }
    }
}

/// Drive the router until every [`RouterHandle`] is dropped
pub async fn run(
    mut router: BroadcastRouter,
    mut events: mpsc::Receiver<Event>,
    mut expiries: mpsc::UnboundedReceiver<String>,
) {
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => router.apply(event),
                None => break,
            },
            Some(room_id) = expiries.recv() => router.expire(&room_id),
        }
    }
    tracing::info!("Router stopped");
}

/// Cloneable handle for queueing events on the router task
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Event>,
}

impl RouterHandle {
    /// Build a registry and router and start the router task
    pub fn spawn(grace_period: Duration) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let router = BroadcastRouter::new(RoomRegistry::new(grace_period, expiry_tx));
        tokio::spawn(run(router, rx, expiry_rx));
        Self { tx }
    }

    async fn send(&self, event: Event) -> Result<()> {
        self.tx.send(event).await.map_err(|_| AppError::RouterClosed)
    }

    pub async fn connect(&self, connection_id: Uuid, outbox: mpsc::Sender<ServerMessage>) -> Result<()> {
        self.send(Event::Connected {
            connection_id,
            outbox,
        })
        .await
    }

    pub async fn message(&self, connection_id: Uuid, message: ClientMessage) -> Result<()> {
        self.send(Event::Message {
            connection_id,
            message,
        })
        .await
    }

    pub async fn disconnect(&self, connection_id: Uuid) -> Result<()> {
        self.send(Event::Disconnected { connection_id }).await
    }

    pub async fn inspect(&self, room_id: impl Into<String>) -> Result<Option<RoomSummary>> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Inspect {
            room_id: room_id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| AppError::RouterClosed)
    }
}
