//! Data models for drawing operations and room members

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Largest accepted absolute coordinate in a chunk
pub const MAX_COORDINATE: f64 = 1_000_000.0;

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

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Finite and within [`MAX_COORDINATE`] on both axes
    pub fn in_bounds(&self) -> bool {
        self.is_finite() && self.x.abs() <= MAX_COORDINATE && self.y.abs() <= MAX_COORDINATE
    }
}

/// How a stroke is composited onto the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composite {
    #[default]
    #[serde(alias = "source-over")]
    Normal,
    #[serde(alias = "destination-out")]
    Erase,
}

/// Brush style attached to every chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: String,
    pub size: f64,
    #[serde(default)]
    pub composite: Composite,
}

impl Style {
    pub fn validate(&self) -> Result<()> {
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(AppError::InvalidPayload(format!(
                "brush size must be positive, got {}",
                self.size
            )));
        }
        Ok(())
    }
}

/// One logged drawing action. Immutable once appended to a room log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    #[serde(rename = "stroke")]
    Stroke { points: Vec<Point>, style: Style },
    #[serde(rename = "erase")]
    Erase { points: Vec<Point>, style: Style },
    #[serde(rename = "stroke:end")]
    StrokeEnd { ts: Option<i64> },
}

impl Operation {
    /// Check a chunk operation for values that cannot be rendered
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::Stroke { points, style } | Operation::Erase { points, style } => {
                style.validate()?;
                if let Some(p) = points.iter().find(|p| !p.in_bounds()) {
                    return Err(AppError::InvalidPayload(format!(
                        "point out of range ({}, {})",
                        p.x, p.y
                    )));
                }
                Ok(())
            }
            Operation::StrokeEnd { .. } => Ok(()),
        }
    }
}

/// A logged operation tagged with the connection that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub by: Uuid,
    #[serde(flatten)]
    pub op: Operation,
}

impl Entry {
    pub fn new(by: Uuid, op: Operation) -> Self {
        Self { by, op }
    }
}

/// Profile a client supplies when joining a room
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// A room member as listed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl User {
    pub fn new(id: Uuid, profile: UserProfile) -> Self {
        Self {
            id,
            name: profile.name,
            color: profile.color,
        }
    }
}
