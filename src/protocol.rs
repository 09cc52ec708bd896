//! Wire protocol for drawing rooms
//!
//! Every frame is a JSON object tagged by `type`, using the event names
//! clients already speak (`room:join`, `stroke:chunk`, ...).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Entry, Operation, Point, Style, User, UserProfile};

/// Messages from client to server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join (or create) a room
    #[serde(rename = "room:join")]
    RoomJoin {
        #[serde(rename = "roomId", default)]
        room_id: Option<String>,
        #[serde(default)]
        user: UserProfile,
    },
    /// Live pointer position, relayed as-is
    #[serde(rename = "cursor")]
    Cursor {
        #[serde(flatten)]
        payload: serde_json::Map<String, serde_json::Value>,
    },
    /// Batch of stroke points
    #[serde(rename = "stroke:chunk")]
    StrokeChunk { points: Vec<Point>, style: Style },
    /// Batch of eraser points
    #[serde(rename = "erase:chunk")]
    EraseChunk { points: Vec<Point>, style: Style },
    /// Current stroke is finished
    #[serde(rename = "stroke:end")]
    StrokeEnd {
        #[serde(default)]
        ts: Option<i64>,
    },
    #[serde(rename = "history:undo")]
    HistoryUndo,
    #[serde(rename = "history:redo")]
    HistoryRedo,
    /// Round-trip probe
    #[serde(rename = "ping:latency")]
    PingLatency,
}

impl ClientMessage {
    /// The log operation a draw event produces, if any
    pub fn to_operation(&self) -> Option<Operation> {
        match self {
            ClientMessage::StrokeChunk { points, style } => Some(Operation::Stroke {
                points: points.clone(),
                style: style.clone(),
            }),
            ClientMessage::EraseChunk { points, style } => Some(Operation::Erase {
                points: points.clone(),
                style: style.clone(),
            }),
            ClientMessage::StrokeEnd { ts } => Some(Operation::StrokeEnd { ts: *ts }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::RoomJoin { .. } => "room:join",
            ClientMessage::Cursor { .. } => "cursor",
            ClientMessage::StrokeChunk { .. } => "stroke:chunk",
            ClientMessage::EraseChunk { .. } => "erase:chunk",
            ClientMessage::StrokeEnd { .. } => "stroke:end",
            ClientMessage::HistoryUndo => "history:undo",
            ClientMessage::HistoryRedo => "history:redo",
            ClientMessage::PingLatency => "ping:latency",
        }
    }
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent to a connection that just joined. History is never replayed here.
    #[serde(rename = "room:init")]
    RoomInit {
        #[serde(rename = "roomId")]
        room_id: String,
        users: Vec<User>,
        ops: Vec<Entry>,
    },
    #[serde(rename = "user:joined")]
    UserJoined {
        id: Uuid,
        user: UserProfile,
        users: Vec<User>,
    },
    #[serde(rename = "user:left")]
    UserLeft { id: Uuid, users: Vec<User> },
    #[serde(rename = "cursor")]
    Cursor {
        id: Uuid,
        #[serde(flatten)]
        payload: serde_json::Map<String, serde_json::Value>,
    },
    #[serde(rename = "stroke:chunk")]
    StrokeChunk {
        by: Uuid,
        points: Vec<Point>,
        style: Style,
    },
    #[serde(rename = "erase:chunk")]
    EraseChunk {
        by: Uuid,
        points: Vec<Point>,
        style: Style,
    },
    #[serde(rename = "stroke:end")]
    StrokeEnd {
        by: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        ts: Option<i64>,
    },
    /// Full history after an undo or redo
    #[serde(rename = "history:apply")]
    HistoryApply { entries: Vec<Entry> },
    #[serde(rename = "pong:latency")]
    PongLatency,
}

impl ServerMessage {
    /// Re-emit a draw operation on behalf of its originator
    pub fn relay(by: Uuid, op: Operation) -> Self {
        match op {
            Operation::Stroke { points, style } => ServerMessage::StrokeChunk { by, points, style },
            Operation::Erase { points, style } => ServerMessage::EraseChunk { by, points, style },
            Operation::StrokeEnd { ts } => ServerMessage::StrokeEnd { by, ts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Composite;
    use serde_json::json;

    #[test]
    fn test_parse_room_join() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "room:join",
            "roomId": "studio",
            "user": {"name": "Ada", "color": "#4ECDC4"}
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::RoomJoin {
                room_id: Some("studio".to_string()),
                user: UserProfile {
                    name: "Ada".to_string(),
                    color: "#4ECDC4".to_string()
                }
            }
        );
    }

    #[test]
    fn test_parse_room_join_without_room_or_user() {
        let msg: ClientMessage = serde_json::from_value(json!({"type": "room:join"})).unwrap();
        assert_eq!(
            msg,
            ClientMessage::RoomJoin {
                room_id: None,
                user: UserProfile::default()
            }
        );
    }

    #[test]
    fn test_parse_chunk_and_convert() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "erase:chunk",
            "points": [{"x": 1.0, "y": 2.0}],
            "style": {"color": "#000", "size": 12, "composite": "destination-out"}
        }))
        .unwrap();
        match msg.to_operation() {
            Some(Operation::Erase { points, style }) => {
                assert_eq!(points, vec![Point::new(1.0, 2.0)]);
                assert_eq!(style.composite, Composite::Erase);
            }
            other => panic!("Expected erase operation, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unit_events() {
        let undo: ClientMessage = serde_json::from_value(json!({"type": "history:undo"})).unwrap();
        assert_eq!(undo, ClientMessage::HistoryUndo);
        assert!(undo.to_operation().is_none());

        let ping: ClientMessage = serde_json::from_value(json!({"type": "ping:latency"})).unwrap();
        assert_eq!(ping.name(), "ping:latency");
    }

    #[test]
    fn test_parse_cursor_keeps_payload() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "cursor", "x": 4, "y": 5, "down": true})).unwrap();
        match msg {
            ClientMessage::Cursor { payload } => {
                assert_eq!(payload["x"], 4);
                assert_eq!(payload["down"], true);
                assert!(!payload.contains_key("type"));
            }
            other => panic!("Expected cursor, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "board:nuke"})).is_err());
    }

    #[test]
    fn test_serialize_relay_chunk() {
        let by = Uuid::new_v4();
        let msg = ServerMessage::relay(
            by,
            Operation::Stroke {
                points: vec![Point::new(0.0, 0.0)],
                style: Style {
                    color: "#111".to_string(),
                    size: 2.0,
                    composite: Composite::Normal,
                },
            },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "stroke:chunk");
        assert_eq!(json["by"], by.to_string());
        assert_eq!(json["style"]["composite"], "normal");
    }

    #[test]
    fn test_serialize_room_init() {
        let msg = ServerMessage::RoomInit {
            room_id: "public".to_string(),
            users: vec![],
            ops: vec![],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "room:init");
        assert_eq!(json["roomId"], "public");
        assert!(json["ops"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_serialize_cursor_merges_id() {
        let id = Uuid::new_v4();
        let mut payload = serde_json::Map::new();
        payload.insert("x".to_string(), json!(10));
        let json = serde_json::to_value(ServerMessage::Cursor { id, payload }).unwrap();
        assert_eq!(json["type"], "cursor");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["x"], 10);
    }
}
