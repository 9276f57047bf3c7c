//! Saved character roster API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::error_response;
use crate::application::dto::{CreatedIdResponseDto, RosterUpdateDto};
use crate::domain::entities::Character;
use crate::domain::value_objects::CombatantId;
use crate::infrastructure::state::AppState;

pub async fn list_roster(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Character>>, (StatusCode, String)> {
    state.roster.list().await.map(Json).map_err(error_response)
}

pub async fn add_to_roster(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Character>,
) -> Result<(StatusCode, Json<Character>), (StatusCode, String)> {
    let character = state.roster.add(req).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(character)))
}

pub async fn update_roster(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RosterUpdateDto>,
) -> Result<Json<Character>, (StatusCode, String)> {
    state
        .roster
        .update(&req.old_name, req.character)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_from_roster(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.roster.delete(&name).await.map_err(error_response)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Character not found".to_string()))
    }
}

/// Put a saved character into the encounter at full HP
pub async fn add_roster_to_encounter(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<CreatedIdResponseDto<CombatantId>>), (StatusCode, String)> {
    let id = state
        .roster
        .add_to_encounter(&name)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(CreatedIdResponseDto { id })))
}
