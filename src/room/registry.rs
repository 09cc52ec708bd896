//! Room lifecycle and membership
//!
//! Rooms are created lazily on first join. When the last member leaves, a
//! deletion task is scheduled for the grace period; when it fires it posts
//! the room id to the expiry channel and the owner of the registry calls
//! [`RoomRegistry::expire`], which only removes the room if it is still empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use super::log::OperationLog;
use crate::models::{User, UserProfile};

/// Room used when a client does not name one
pub const DEFAULT_ROOM: &str = "public";

/// How long an empty room is kept around before it is destroyed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Normalize a requested room id, falling back to [`DEFAULT_ROOM`]
pub fn resolve_room_id(room_id: Option<&str>) -> String {
    match room_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => DEFAULT_ROOM.to_string(),
    }
}

/// A drawing room: its members in join order and its operation log
#[derive(Debug)]
pub struct Room {
    id: String,
    members: Vec<User>,
    log: OperationLog,
    created_at: DateTime<Utc>,
}

impl Room {
    fn new(id: String) -> Self {
        Self {
            id,
            members: Vec::new(),
            log: OperationLog::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> &[User] {
        &self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.members.iter().map(|u| u.id)
    }

    pub fn contains(&self, connection_id: Uuid) -> bool {
        self.members.iter().any(|u| u.id == connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut OperationLog {
        &mut self.log
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Register a member; an existing entry for the connection keeps its position
    fn insert(&mut self, user: User) {
        match self.members.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.members.push(user),
        }
    }

    fn remove(&mut self, connection_id: Uuid) -> Option<User> {
        let index = self.members.iter().position(|u| u.id == connection_id)?;
        Some(self.members.remove(index))
    }
}

/// Read-only view of a room for inspection endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub users: Vec<User>,
    pub op_count: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    pub created_at: DateTime<Utc>,
}

/// Owns every live room, keyed by room id
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    pending_deletions: HashMap<String, AbortHandle>,
    grace_period: Duration,
    expiry_tx: mpsc::UnboundedSender<String>,
}

impl RoomRegistry {
    /// Create a registry. Room ids whose grace period ran out are sent on `expiry_tx`.
    pub fn new(grace_period: Duration, expiry_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            rooms: HashMap::new(),
            pending_deletions: HashMap::new(),
            grace_period,
            expiry_tx,
        }
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// Membership in any other room is left untouched; callers leave the
    /// previous room first.
    pub fn join(&mut self, room_id: Option<&str>, connection_id: Uuid, profile: UserProfile) -> String {
        let room_id = resolve_room_id(room_id);

        if let Some(handle) = self.pending_deletions.remove(&room_id) {
            handle.abort();
            tracing::debug!(room = %room_id, "Cancelled pending room deletion");
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(room = %room_id, "Created room");
            Room::new(room_id.clone())
        });
        room.insert(User::new(connection_id, profile));

        room_id
    }

    /// Remove a connection from a room. Schedules deletion if the room becomes empty.
    pub fn leave(&mut self, room_id: &str, connection_id: Uuid) -> Option<User> {
        let room = self.rooms.get_mut(room_id)?;
        let removed = room.remove(connection_id)?;

        if room.is_empty() {
            self.schedule_deletion(room_id);
        }

        Some(removed)
    }

    /// Fire-time check for a scheduled deletion. Returns true if the room was destroyed.
    pub fn expire(&mut self, room_id: &str) -> bool {
        self.pending_deletions.remove(room_id);

        let still_empty = self.rooms.get(room_id).is_some_and(Room::is_empty);
        if still_empty {
            self.rooms.remove(room_id);
            tracing::info!(room = %room_id, "Destroyed empty room");
        } else {
            tracing::debug!(room = %room_id, "Room rejoined during grace period, keeping it");
        }
        still_empty
    }

    pub fn list_users(&self, room_id: &str) -> Vec<User> {
        self.rooms
            .get(room_id)
            .map(|room| room.members.clone())
            .unwrap_or_default()
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_deletion_pending(&self, room_id: &str) -> bool {
        self.pending_deletions.contains_key(room_id)
    }

    pub fn summary(&self, room_id: &str) -> Option<RoomSummary> {
        self.rooms.get(room_id).map(|room| RoomSummary {
            id: room.id().to_string(),
            users: room.members().to_vec(),
            op_count: room.log().len(),
            can_undo: room.log().can_undo(),
            can_redo: room.log().can_redo(),
            created_at: room.created_at(),
        })
    }

    fn schedule_deletion(&mut self, room_id: &str) {
        let grace_period = self.grace_period;
        let expiry_tx = self.expiry_tx.clone();
        let id = room_id.to_string();

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            let _ = expiry_tx.send(id);
        });

        if let Some(previous) = self
            .pending_deletions
            .insert(room_id.to_string(), task.abort_handle())
        {
            previous.abort();
        }

        tracing::debug!(room = %room_id, ?grace_period, "Room empty, deletion scheduled");
    }
}

impl Drop for RoomRegistry {
    fn drop(&mut self) {
        for (_, handle) in self.pending_deletions.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, Operation};

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            name: name.to_string(),
            color: "#FF6B6B".to_string(),
        }
    }

    fn registry() -> (RoomRegistry, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RoomRegistry::new(DEFAULT_GRACE_PERIOD, tx), rx)
    }

    #[test]
    fn test_resolve_room_id() {
        assert_eq!(resolve_room_id(None), "public");
        assert_eq!(resolve_room_id(Some("")), "public");
        assert_eq!(resolve_room_id(Some("   ")), "public");
        assert_eq!(resolve_room_id(Some(" studio ")), "studio");
    }

    #[tokio::test]
    async fn test_join_creates_room_and_lists_in_join_order() {
        let (mut registry, _rx) = registry();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert_eq!(registry.join(Some("x"), alice, profile("Alice")), "x");
        assert_eq!(registry.join(Some("x"), bob, profile("Bob")), "x");

        let users = registry.list_users("x");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, alice);
        assert_eq!(users[0].name, "Alice");
        assert_eq!(users[1].id, bob);
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn test_join_defaults_to_public() {
        let (mut registry, _rx) = registry();
        let room_id = registry.join(None, Uuid::new_v4(), profile("Alice"));
        assert_eq!(room_id, DEFAULT_ROOM);
        assert!(registry.room(DEFAULT_ROOM).is_some());
    }

    #[tokio::test]
    async fn test_rejoin_same_connection_keeps_single_entry() {
        let (mut registry, _rx) = registry();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        registry.join(Some("x"), alice, profile("Alice"));
        registry.join(Some("x"), bob, profile("Bob"));
        registry.join(Some("x"), alice, profile("Alice 2"));

        let users = registry.list_users("x");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Alice 2");
    }

    #[tokio::test]
    async fn test_join_does_not_leave_other_rooms() {
        let (mut registry, _rx) = registry();
        let alice = Uuid::new_v4();
        registry.join(Some("a"), alice, profile("Alice"));
        registry.join(Some("b"), alice, profile("Alice"));

        assert!(registry.room("a").unwrap().contains(alice));
        assert!(registry.room("b").unwrap().contains(alice));
    }

    #[tokio::test]
    async fn test_leave_absent_is_noop() {
        let (mut registry, _rx) = registry();
        assert!(registry.leave("nowhere", Uuid::new_v4()).is_none());

        registry.join(Some("x"), Uuid::new_v4(), profile("Alice"));
        assert!(registry.leave("x", Uuid::new_v4()).is_none());
        assert!(!registry.is_deletion_pending("x"));
    }

    #[tokio::test]
    async fn test_list_users_absent_room_is_empty() {
        let (registry, _rx) = registry();
        assert!(registry.list_users("ghost").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_room_destroyed_after_grace_period() {
        let (mut registry, mut rx) = registry();
        let alice = Uuid::new_v4();
        registry.join(Some("x"), alice, profile("Alice"));
        registry.leave("x", alice);
        tokio::task::yield_now().await;
        assert!(registry.is_deletion_pending("x"));
        assert!(registry.room("x").is_some());

        tokio::time::advance(DEFAULT_GRACE_PERIOD - Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        let expired = rx.recv().await.unwrap();
        assert_eq!(expired, "x");
        assert!(registry.expire(&expired));
        assert!(registry.room("x").is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejoin_during_grace_period_keeps_room_and_log() {
        let (mut registry, mut rx) = registry();
        let alice = Uuid::new_v4();
        registry.join(Some("x"), alice, profile("Alice"));
        registry
            .room_mut("x")
            .unwrap()
            .log_mut()
            .push(Entry::new(alice, Operation::StrokeEnd { ts: Some(1) }));
        registry.leave("x", alice);
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        let bob = Uuid::new_v4();
        registry.join(Some("x"), bob, profile("Bob"));
        assert!(!registry.is_deletion_pending("x"));

        tokio::time::advance(DEFAULT_GRACE_PERIOD).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        let room = registry.room("x").unwrap();
        assert_eq!(room.log().len(), 1);
        assert_eq!(room.members().len(), 1);
    }

    #[tokio::test]
    async fn test_expire_rechecks_emptiness() {
        let (mut registry, _rx) = registry();
        let alice = Uuid::new_v4();
        registry.join(Some("x"), alice, profile("Alice"));

        // Stale expiry for a room that has members again
        assert!(!registry.expire("x"));
        assert!(registry.room("x").is_some());

        assert!(!registry.expire("ghost"));
    }

    #[tokio::test]
    async fn test_summary() {
        let (mut registry, _rx) = registry();
        let alice = Uuid::new_v4();
        registry.join(Some("x"), alice, profile("Alice"));
        registry
            .room_mut("x")
            .unwrap()
            .log_mut()
            .push(Entry::new(alice, Operation::StrokeEnd { ts: None }));

        let summary = registry.summary("x").unwrap();
        assert_eq!(summary.id, "x");
        assert_eq!(summary.created_at, registry.room("x").unwrap().created_at());
        assert_eq!(summary.users.len(), 1);
        assert_eq!(summary.op_count, 1);
        assert!(summary.can_undo);
        assert!(!summary.can_redo);
        assert!(registry.summary("y").is_none());
    }
}
