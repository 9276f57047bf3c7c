//! HTTP REST API routes

mod combat_routes;
mod history_routes;
mod record_routes;
mod roster_routes;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};

use crate::domain::error::DomainError;
use crate::infrastructure::state::AppState;

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Live encounter
        .route("/api/combat", get(combat_routes::get_combat))
        .route("/api/combat/stats", get(combat_routes::get_live_stats))
        .route("/api/combat/combatants", post(combat_routes::add_combatant))
        .route(
            "/api/combat/combatants/{id}",
            put(combat_routes::update_combatant),
        )
        .route(
            "/api/combat/combatants/{id}",
            delete(combat_routes::remove_combatant),
        )
        .route(
            "/api/combat/combatants/{id}/hp",
            put(combat_routes::set_current_hp),
        )
        .route(
            "/api/combat/combatants/{id}/temp-hp",
            put(combat_routes::set_temp_hp),
        )
        .route(
            "/api/combat/combatants/{id}/conditions",
            post(combat_routes::afflict),
        )
        .route(
            "/api/combat/combatants/{id}/conditions/remove",
            post(combat_routes::remove_condition),
        )
        .route("/api/combat/start", post(combat_routes::start_combat))
        .route("/api/combat/next-turn", post(combat_routes::next_turn))
        .route("/api/combat/attack", post(combat_routes::attack))
        .route("/api/combat/save", post(combat_routes::saving_throw))
        .route("/api/combat/heal", post(combat_routes::heal))
        .route("/api/combat/temp-hp", post(combat_routes::grant_temp_hp))
        .route("/api/combat/log", delete(combat_routes::clear_log))
        .route("/api/combat/end", post(combat_routes::end_combat))
        .route("/api/combat/reset", post(combat_routes::reset_combat))
        // Archived encounters
        .route("/api/history", get(history_routes::list_history))
        .route("/api/history/backup", get(history_routes::list_backup))
        .route(
            "/api/history/backup/{id}",
            delete(history_routes::delete_backup),
        )
        .route("/api/history/{id}", get(history_routes::get_history))
        .route("/api/history/{id}", put(history_routes::rename_history))
        .route("/api/history/{id}", delete(history_routes::delete_history))
        // Saved roster
        .route("/api/roster", get(roster_routes::list_roster))
        .route("/api/roster", post(roster_routes::add_to_roster))
        .route("/api/roster", put(roster_routes::update_roster))
        .route("/api/roster/{name}", delete(roster_routes::delete_from_roster))
        .route(
            "/api/roster/{name}/encounter",
            post(roster_routes::add_roster_to_encounter),
        )
        // Record store
        .route("/api/characters", get(record_routes::list_characters))
        .route("/api/characters", post(record_routes::create_character))
        .route("/api/characters/{id}", put(record_routes::update_character))
        .route(
            "/api/characters/{id}",
            delete(record_routes::delete_character),
        )
        .route("/api/npcs", get(record_routes::list_npcs))
        .route("/api/npcs", post(record_routes::create_npc))
        .route("/api/npcs/{id}", put(record_routes::update_npc))
        .route("/api/npcs/{id}", delete(record_routes::delete_npc))
        .route(
            "/api/npcs/{id}/encounter",
            post(record_routes::add_npc_to_encounter),
        )
}

/// Map a service error onto a status code. Domain errors keep their
/// meaning; anything else is a server fault.
pub(crate) fn error_response(error: anyhow::Error) -> (StatusCode, String) {
    let status = match error.downcast_ref::<DomainError>() {
        Some(DomainError::Validation(_)) | Some(DomainError::Parse(_)) => StatusCode::BAD_REQUEST,
        Some(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Some(DomainError::Conflict(_)) | Some(DomainError::InvalidStateTransition(_)) => {
            StatusCode::CONFLICT
        }
        None => {
            tracing::error!("Request failed: {:#}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string())
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, (StatusCode, String)> {
    raw.parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid {} ID", what)))
}
