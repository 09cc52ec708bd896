//! Drawing rooms: membership, lifecycle and per-room history

pub mod log;
pub mod registry;

pub use log::{OperationLog, Snapshot};
pub use registry::{resolve_room_id, Room, RoomRegistry, RoomSummary, DEFAULT_GRACE_PERIOD, DEFAULT_ROOM};
