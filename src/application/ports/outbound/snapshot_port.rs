//! Snapshot ports - the shared combat state and the saved roster
//!
//! Both are whole-value key/value records: every save replaces what was
//! stored, and the last write wins.

use async_trait::async_trait;

use crate::domain::aggregates::CombatState;
use crate::domain::entities::Character;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait CombatSnapshotPort: Send + Sync {
    /// `None` when nothing has been saved yet
    async fn load_combat(&self) -> Result<Option<CombatState>, SnapshotError>;
    async fn save_combat(&self, state: &CombatState) -> Result<(), SnapshotError>;
}

#[async_trait]
pub trait RosterStorePort: Send + Sync {
    async fn load_roster(&self) -> Result<Vec<Character>, SnapshotError>;
    async fn save_roster(&self, roster: &[Character]) -> Result<(), SnapshotError>;
}
