//! WebSocket handler for combat viewers
//!
//! Clients join as a game master or a player and receive every committed
//! combat state. Game masters may also advance turns and end the encounter
//! from the socket; everything else goes through the HTTP API.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::aggregates::CombatState;
use crate::domain::value_objects::HistoryId;
use crate::infrastructure::state::AppState;
use crate::infrastructure::viewers::{ViewerId, ViewerRole};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let viewer_id = ViewerId::new();

    // Create a channel for sending messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tracing::info!("New WebSocket connection established: {}", viewer_id);

    // Spawn a task to forward messages from the channel to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Some(response) = handle_message(msg, &state, viewer_id, tx.clone()).await
                    {
                        if tx.send(response).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to parse message: {}", e);
                    let error = ServerMessage::Error {
                        code: "PARSE_ERROR".to_string(),
                        message: format!("Invalid message format: {}", e),
                    };
                    if tx.send(error).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket connection closed by client: {}", viewer_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                let _ = tx.send(ServerMessage::Pong);
            }
            Err(e) => {
                tracing::error!("WebSocket error for viewer {}: {}", viewer_id, e);
                break;
            }
            _ => {}
        }
    }

    if let Some(viewer) = state.viewers.write().await.leave(viewer_id) {
        let connected = chrono::Utc::now() - viewer.joined_at;
        tracing::info!(
            "Viewer {} ({:?}) left after {}s",
            viewer_id,
            viewer.role,
            connected.num_seconds()
        );
    }

    send_task.abort();

    tracing::info!("WebSocket connection terminated: {}", viewer_id);
}

async fn handle_message(
    msg: ClientMessage,
    state: &AppState,
    viewer_id: ViewerId,
    sender: mpsc::UnboundedSender<ServerMessage>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::JoinCombat { role } => {
            state.viewers.write().await.join(viewer_id, role, sender);
            tracing::info!("Viewer {} joined as {:?}", viewer_id, role);
            Some(ServerMessage::CombatJoined {
                role,
                state: state.combat.snapshot().await,
            })
        }
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),
        ClientMessage::RequestState => Some(ServerMessage::CombatStateUpdated {
            state: state.combat.snapshot().await,
        }),
        ClientMessage::NextTurn => {
            if let Err(error) = require_game_master(state, viewer_id).await {
                return Some(error);
            }
            if state.combat.next_turn().await {
                // The push worker delivers the new state
                None
            } else {
                Some(ServerMessage::Error {
                    code: "NO_COMBATANTS".to_string(),
                    message: "There is nobody to pass the turn to".to_string(),
                })
            }
        }
        ClientMessage::EndCombat => {
            if let Err(error) = require_game_master(state, viewer_id).await {
                return Some(error);
            }
            match state.combat.end_combat().await {
                Some(record) => Some(ServerMessage::CombatEnded {
                    history_id: record.id,
                    title: record.title,
                }),
                None => Some(ServerMessage::Error {
                    code: "NOT_ACTIVE".to_string(),
                    message: "No active combat to end".to_string(),
                }),
            }
        }
    }
}

async fn require_game_master(state: &AppState, viewer_id: ViewerId) -> Result<(), ServerMessage> {
    match state.viewers.read().await.role_of(viewer_id) {
        Some(ViewerRole::GameMaster) => Ok(()),
        Some(ViewerRole::Player) => Err(ServerMessage::Error {
            code: "FORBIDDEN".to_string(),
            message: "Only the game master can do that".to_string(),
        }),
        None => Err(ServerMessage::Error {
            code: "NOT_JOINED".to_string(),
            message: "Join the combat first".to_string(),
        }),
    }
}

/// Messages from a viewer to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    JoinCombat { role: ViewerRole },
    Heartbeat,
    /// Ask for the current state without waiting for the next change
    RequestState,
    NextTurn,
    EndCombat,
}

/// Messages from the server to a viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    CombatJoined {
        role: ViewerRole,
        state: CombatState,
    },
    /// Pushed after every committed change
    CombatStateUpdated { state: CombatState },
    CombatEnded { history_id: HistoryId, title: String },
    Pong,
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewCombatant;
    use crate::infrastructure::state::test_state;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"JoinCombat","role":"GameMaster"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::JoinCombat {
                role: ViewerRole::GameMaster
            }
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"Attack"}"#).is_err());
    }

    #[test]
    fn test_state_push_uses_snapshot_names() {
        let json = serde_json::to_value(ServerMessage::CombatStateUpdated {
            state: CombatState::default(),
        })
        .unwrap();
        assert_eq!(json["type"], "CombatStateUpdated");
        assert_eq!(json["state"]["currentTurn"], 0);
        assert_eq!(json["state"]["phase"], "setup");
    }

    #[tokio::test]
    async fn test_players_cannot_drive_combat() {
        let (state, _dir) = test_state().await;
        let player = ViewerId::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let response =
            handle_message(ClientMessage::NextTurn, &state, player, tx.clone()).await;
        assert!(matches!(response, Some(ServerMessage::Error { ref code, .. }) if code == "NOT_JOINED"));

        handle_message(
            ClientMessage::JoinCombat {
                role: ViewerRole::Player,
            },
            &state,
            player,
            tx.clone(),
        )
        .await;
        let response = handle_message(ClientMessage::EndCombat, &state, player, tx).await;
        assert!(matches!(response, Some(ServerMessage::Error { ref code, .. }) if code == "FORBIDDEN"));
    }

    #[tokio::test]
    async fn test_game_master_advances_and_ends_combat() {
        let (state, _dir) = test_state().await;
        state
            .combat
            .add_combatant(NewCombatant::new("Aria", 24, 16).as_player())
            .await
            .unwrap();
        state
            .combat
            .add_combatant(NewCombatant::new("Goblin", 7, 13))
            .await
            .unwrap();
        state.combat.start_combat().await.unwrap();

        let gm = ViewerId::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let joined = handle_message(
            ClientMessage::JoinCombat {
                role: ViewerRole::GameMaster,
            },
            &state,
            gm,
            tx.clone(),
        )
        .await;
        assert!(matches!(joined, Some(ServerMessage::CombatJoined { .. })));

        assert!(handle_message(ClientMessage::NextTurn, &state, gm, tx.clone())
            .await
            .is_none());
        assert_eq!(state.combat.snapshot().await.current_turn, 1);

        let ended = handle_message(ClientMessage::EndCombat, &state, gm, tx).await;
        assert!(
            matches!(ended, Some(ServerMessage::CombatEnded { ref title, .. }) if title == "Aria vs Goblin")
        );
    }
}
