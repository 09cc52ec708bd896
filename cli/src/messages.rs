//! WebSocket message types for the Sketchroom protocol
//!
//! These types mirror the server's protocol. Some fields may not be used
//! directly by the CLI but are part of the complete protocol.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point in canvas-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at fraction `t` of the way towards `other`
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composite {
    #[default]
    #[serde(alias = "source-over")]
    Normal,
    #[serde(alias = "destination-out")]
    Erase,
}

/// Brush style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: String,
    pub size: f64,
    #[serde(default)]
    pub composite: Composite,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            size: 4.0,
            composite: Composite::Normal,
        }
    }
}

/// Partial style update; only the fields that are set change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePatch {
    pub color: Option<String>,
    pub size: Option<f64>,
    pub composite: Option<Composite>,
}

impl StylePatch {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn size(size: f64) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn composite(composite: Composite) -> Self {
        Self {
            composite: Some(composite),
            ..Self::default()
        }
    }
}

impl Style {
    /// Apply a partial update. Non-positive or non-finite sizes are ignored.
    pub fn apply(&mut self, patch: StylePatch) {
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(size) = patch.size {
            if size.is_finite() && size > 0.0 {
                self.size = size;
            }
        }
        if let Some(composite) = patch.composite {
            self.composite = composite;
        }
    }

    /// Same style with erase compositing
    pub fn erasing(&self) -> Style {
        Style {
            composite: Composite::Erase,
            ..self.clone()
        }
    }
}

/// A logged drawing operation as it appears in history snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    #[serde(rename = "stroke")]
    Stroke { points: Vec<Point>, style: Style },
    #[serde(rename = "erase")]
    Erase { points: Vec<Point>, style: Style },
    #[serde(rename = "stroke:end")]
    StrokeEnd {
        #[serde(default)]
        ts: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub by: Uuid,
    #[serde(flatten)]
    pub op: Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

/// Messages from client to server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "room:join")]
    RoomJoin {
        #[serde(rename = "roomId", skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        user: UserProfile,
    },
    #[serde(rename = "cursor")]
    Cursor { x: f64, y: f64 },
    #[serde(rename = "stroke:chunk")]
    StrokeChunk { points: Vec<Point>, style: Style },
    #[serde(rename = "erase:chunk")]
    EraseChunk { points: Vec<Point>, style: Style },
    #[serde(rename = "stroke:end")]
    StrokeEnd { ts: i64 },
    #[serde(rename = "history:undo")]
    HistoryUndo,
    #[serde(rename = "history:redo")]
    HistoryRedo,
    #[serde(rename = "ping:latency")]
    PingLatency,
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "room:init")]
    RoomInit {
        #[serde(rename = "roomId", default)]
        room_id: String,
        users: Vec<User>,
        #[serde(default)]
        ops: Vec<Entry>,
    },
    #[serde(rename = "user:joined")]
    UserJoined {
        id: Uuid,
        #[serde(default)]
        user: Option<UserProfile>,
        #[serde(default)]
        users: Option<Vec<User>>,
    },
    #[serde(rename = "user:left")]
    UserLeft {
        id: Uuid,
        #[serde(default)]
        users: Option<Vec<User>>,
    },
    #[serde(rename = "cursor")]
    Cursor {
        id: Uuid,
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
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
        #[serde(default)]
        ts: Option<i64>,
    },
    #[serde(rename = "history:apply")]
    HistoryApply { entries: Vec<Entry> },
    #[serde(rename = "pong:latency")]
    PongLatency,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_style_apply_only_touches_set_fields() {
        let mut style = Style::default();
        style.apply(StylePatch::color("#FF6B6B"));
        assert_eq!(style.color, "#FF6B6B");
        assert_eq!(style.size, 4.0);

        style.apply(StylePatch::size(12.0));
        assert_eq!(style.size, 12.0);
        assert_eq!(style.color, "#FF6B6B");

        style.apply(StylePatch::composite(Composite::Erase));
        assert_eq!(style.composite, Composite::Erase);
        assert_eq!(style.size, 12.0);
    }

    #[test]
    fn test_style_apply_ignores_bad_size() {
        let mut style = Style::default();
        style.apply(StylePatch::size(0.0));
        style.apply(StylePatch::size(f64::NAN));
        assert_eq!(style.size, 4.0);
    }

    #[test]
    fn test_point_helpers() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.lerp(&b, 0.5), Point::new(1.5, 2.0));
    }

    #[test]
    fn test_join_serialization_skips_missing_room() {
        let msg = ClientMessage::RoomJoin {
            room_id: None,
            user: UserProfile {
                name: "Ada".to_string(),
                color: "#000".to_string(),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "room:join");
        assert!(json.get("roomId").is_none());
    }

    #[test]
    fn test_parse_chunk_with_canvas_composite() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "type": "erase:chunk",
            "by": Uuid::nil(),
            "points": [{"x": 1, "y": 2}],
            "style": {"color": "#000", "size": 10, "composite": "destination-out"}
        }))
        .unwrap();
        match msg {
            ServerMessage::EraseChunk { style, points, .. } => {
                assert_eq!(style.composite, Composite::Erase);
                assert_eq!(points[0], Point::new(1.0, 2.0));
            }
            other => panic!("Expected erase chunk, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_history_apply() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "type": "history:apply",
            "entries": [
                {"by": Uuid::nil(), "type": "stroke", "points": [], "style": {"color": "#000", "size": 2}},
                {"by": Uuid::nil(), "type": "stroke:end", "ts": 5}
            ]
        }))
        .unwrap();
        match msg {
            ServerMessage::HistoryApply { entries } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[1].op, Operation::StrokeEnd { ts: Some(5) });
            }
            other => panic!("Expected history apply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_user_left_without_list() {
        let msg: ServerMessage =
            serde_json::from_value(json!({"type": "user:left", "id": Uuid::nil()})).unwrap();
        assert_eq!(
            msg,
            ServerMessage::UserLeft {
                id: Uuid::nil(),
                users: None
            }
        );
    }
}
