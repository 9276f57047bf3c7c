//! Record store API routes: stored characters and NPC templates

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{error_response, parse_id};
use crate::application::dto::CreatedIdResponseDto;
use crate::domain::entities::{
    Character, NewNpc, Npc, NpcKind, NpcPatch, RosterPatch, StoredCharacter,
};
use crate::domain::value_objects::CombatantId;
use crate::infrastructure::state::AppState;

const STORE_UNAVAILABLE: &str = "Record store unavailable";

pub async fn list_characters(State(state): State<Arc<AppState>>) -> Json<Vec<StoredCharacter>> {
    Json(state.records.list_characters().await)
}

pub async fn create_character(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Character>,
) -> Result<(StatusCode, Json<StoredCharacter>), (StatusCode, String)> {
    state
        .records
        .create_character(req)
        .await
        .map_err(error_response)?
        .map(|stored| (StatusCode::CREATED, Json(stored)))
        .ok_or_else(|| (StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE.to_string()))
}

pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<RosterPatch>,
) -> Result<Json<StoredCharacter>, (StatusCode, String)> {
    let id = parse_id(&id, "character")?;
    state
        .records
        .update_character(id, patch)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Character not found".to_string()))
}

pub async fn delete_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "character")?;
    if state.records.delete_character(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Character not found".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct NpcQuery {
    #[serde(rename = "type", default)]
    pub kind: Option<NpcKind>,
}

/// All NPCs, or `?type=enemy` / `?type=ally`
pub async fn list_npcs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NpcQuery>,
) -> Json<Vec<Npc>> {
    Json(state.records.list_npcs(query.kind).await)
}

pub async fn create_npc(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewNpc>,
) -> Result<(StatusCode, Json<Npc>), (StatusCode, String)> {
    state
        .records
        .create_npc(req)
        .await
        .map_err(error_response)?
        .map(|npc| (StatusCode::CREATED, Json(npc)))
        .ok_or_else(|| (StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE.to_string()))
}

pub async fn update_npc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<NpcPatch>,
) -> Result<Json<Npc>, (StatusCode, String)> {
    let id = parse_id(&id, "NPC")?;
    state
        .records
        .update_npc(id, patch)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "NPC not found".to_string()))
}

pub async fn delete_npc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "NPC")?;
    if state.records.delete_npc(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "NPC not found".to_string()))
    }
}

pub async fn add_npc_to_encounter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CreatedIdResponseDto<CombatantId>>), (StatusCode, String)> {
    let id = parse_id(&id, "NPC")?;
    let combatant_id = state
        .records
        .add_npc_to_encounter(id)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(CreatedIdResponseDto { id: combatant_id })))
}
