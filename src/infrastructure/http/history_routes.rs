//! Archived encounter API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{error_response, parse_id};
use crate::application::dto::RenameRequestDto;
use crate::domain::entities::CombatHistory;
use crate::infrastructure::state::AppState;

/// Archived encounters, newest first
pub async fn list_history(State(state): State<Arc<AppState>>) -> Json<Vec<CombatHistory>> {
    Json(state.combat.history().await)
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CombatHistory>, (StatusCode, String)> {
    let id = parse_id(&id, "history")?;
    state
        .combat
        .get_history(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Combat history not found".to_string()))
}

pub async fn rename_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequestDto>,
) -> Result<Json<CombatHistory>, (StatusCode, String)> {
    let id = parse_id(&id, "history")?;
    state
        .combat
        .rename_history(id, &req.title)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "history")?;
    if state.combat.delete_history(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Combat history not found".to_string()))
    }
}

/// Encounters in the record store backup
pub async fn list_backup(State(state): State<Arc<AppState>>) -> Json<Vec<CombatHistory>> {
    Json(state.records.list_backed_up_history().await)
}

pub async fn delete_backup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "history")?;
    if state.records.delete_backed_up_history(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Combat history not found".to_string()))
    }
}
