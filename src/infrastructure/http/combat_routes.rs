//! Live encounter API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{error_response, parse_id};
use crate::application::dto::{
    ActionReportDto, AttackRequestDto, ConditionRequestDto, CreatedIdResponseDto,
    SetValueRequestDto,
};
use crate::domain::aggregates::CombatState;
use crate::domain::entities::{CombatHistory, CombatantPatch, NewCombatant};
use crate::domain::services::{CombatStats, SaveAction, SupportAction};
use crate::domain::value_objects::CombatantId;
use crate::infrastructure::state::AppState;

pub async fn get_combat(State(state): State<Arc<AppState>>) -> Json<CombatState> {
    Json(state.combat.snapshot().await)
}

/// Stats for the encounter so far
pub async fn get_live_stats(State(state): State<Arc<AppState>>) -> Json<CombatStats> {
    let snapshot = state.combat.snapshot().await;
    Json(CombatStats::from_log(&snapshot.log_entries))
}

pub async fn add_combatant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewCombatant>,
) -> Result<(StatusCode, Json<CreatedIdResponseDto<CombatantId>>), (StatusCode, String)> {
    let id = state
        .combat
        .add_combatant(req)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(CreatedIdResponseDto { id })))
}

pub async fn update_combatant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<CombatantPatch>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "combatant")?;
    if state.combat.update_combatant(id, patch).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Combatant not found".to_string()))
    }
}

pub async fn remove_combatant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "combatant")?;
    if state.combat.remove_combatant(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Combatant not found".to_string()))
    }
}

pub async fn set_current_hp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetValueRequestDto>,
) -> Result<Json<ActionReportDto>, (StatusCode, String)> {
    let id = parse_id(&id, "combatant")?;
    Ok(Json(state.combat.set_current_hp(id, req.value).await))
}

pub async fn set_temp_hp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetValueRequestDto>,
) -> Result<Json<ActionReportDto>, (StatusCode, String)> {
    let id = parse_id(&id, "combatant")?;
    Ok(Json(state.combat.set_temp_hp(id, req.value).await))
}

pub async fn afflict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ConditionRequestDto>,
) -> Result<Json<ActionReportDto>, (StatusCode, String)> {
    let id = parse_id(&id, "combatant")?;
    Ok(Json(state.combat.afflict(req.source_id, id, &req.status).await))
}

pub async fn remove_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ConditionRequestDto>,
) -> Result<Json<ActionReportDto>, (StatusCode, String)> {
    let id = parse_id(&id, "combatant")?;
    Ok(Json(
        state
            .combat
            .remove_condition(req.source_id, id, &req.status)
            .await,
    ))
}

pub async fn start_combat(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CombatState>, (StatusCode, String)> {
    state.combat.start_combat().await.map_err(error_response)?;
    Ok(Json(state.combat.snapshot().await))
}

pub async fn next_turn(State(state): State<Arc<AppState>>) -> Json<CombatState> {
    state.combat.next_turn().await;
    Json(state.combat.snapshot().await)
}

pub async fn attack(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AttackRequestDto>,
) -> Json<ActionReportDto> {
    Json(state.combat.attack(req).await)
}

pub async fn saving_throw(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveAction>,
) -> Json<ActionReportDto> {
    Json(state.combat.saving_throw(req).await)
}

pub async fn heal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SupportAction>,
) -> Json<ActionReportDto> {
    Json(state.combat.heal(req).await)
}

pub async fn grant_temp_hp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SupportAction>,
) -> Json<ActionReportDto> {
    Json(state.combat.grant_temp_hp(req).await)
}

pub async fn clear_log(State(state): State<Arc<AppState>>) -> StatusCode {
    state.combat.clear_log().await;
    StatusCode::NO_CONTENT
}

/// Archive the encounter
pub async fn end_combat(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CombatHistory>, (StatusCode, String)> {
    state
        .combat
        .end_combat()
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::CONFLICT, "No active combat to end".to_string()))
}

/// Discard the encounter without archiving it
pub async fn reset_combat(State(state): State<Arc<AppState>>) -> StatusCode {
    state.combat.reset().await;
    StatusCode::NO_CONTENT
}
