//! Connected viewers of the shared combat state
//!
//! Every WebSocket connection registers here with the channel its send task
//! drains. State pushes go to everyone; only a game master may drive the
//! encounter from a socket.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::infrastructure::websocket::ServerMessage;

/// Unique identifier for a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerId(uuid::Uuid);

impl ViewerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewerRole {
    GameMaster,
    Player,
}

#[derive(Debug, Clone)]
pub struct Viewer {
    pub id: ViewerId,
    pub role: ViewerRole,
    pub joined_at: DateTime<Utc>,
    /// Channel to send messages to this client
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Debug, Default)]
pub struct ViewerRegistry {
    viewers: HashMap<ViewerId, Viewer>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register with a new role) a connection
    pub fn join(
        &mut self,
        id: ViewerId,
        role: ViewerRole,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) {
        self.viewers.insert(
            id,
            Viewer {
                id,
                role,
                joined_at: Utc::now(),
                sender,
            },
        );
    }

    pub fn leave(&mut self, id: ViewerId) -> Option<Viewer> {
        self.viewers.remove(&id)
    }

    pub fn role_of(&self, id: ViewerId) -> Option<ViewerRole> {
        self.viewers.get(&id).map(|v| v.role)
    }

    pub fn count(&self) -> usize {
        self.viewers.len()
    }

    /// Send a message to every viewer
    pub fn broadcast(&self, message: &ServerMessage) {
        for viewer in self.viewers.values() {
            if let Err(e) = viewer.sender.send(message.clone()) {
                tracing::warn!("Failed to send message to viewer {}: {}", viewer.id, e);
            }
        }
    }
}
