//! HTTP endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::room::RoomSummary;
use crate::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// Current members and history size of a live room
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummary>> {
    state
        .router
        .inspect(room_id.clone())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("room {}", room_id)))
}
