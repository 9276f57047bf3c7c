//! Record store ports - create/read/update/delete for stored characters,
//! NPC templates and archived encounters
//!
//! Implementations translate between the camel-case domain fields and their
//! own column naming (`maxHP` <-> `max_hp`).

use async_trait::async_trait;

use crate::domain::entities::{
    Character, CombatHistory, NewNpc, Npc, NpcKind, NpcPatch, RosterPatch, StoredCharacter,
};
use crate::domain::value_objects::{CharacterId, HistoryId, NpcId};

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// Character Record Port
// =============================================================================

#[async_trait]
pub trait CharacterRecordPort: Send + Sync {
    async fn get_all(&self) -> Result<Vec<StoredCharacter>, RecordStoreError>;

    async fn create(&self, character: &Character) -> Result<StoredCharacter, RecordStoreError>;

    /// `None` when no record has this id
    async fn update(
        &self,
        id: CharacterId,
        patch: &RosterPatch,
    ) -> Result<Option<StoredCharacter>, RecordStoreError>;

    async fn delete(&self, id: CharacterId) -> Result<bool, RecordStoreError>;
}

// =============================================================================
// NPC Record Port
// =============================================================================

#[async_trait]
pub trait NpcRecordPort: Send + Sync {
    /// All NPCs, or only those of one kind
    async fn get_all(&self, kind: Option<NpcKind>) -> Result<Vec<Npc>, RecordStoreError>;

    async fn create(&self, npc: &NewNpc) -> Result<Npc, RecordStoreError>;

    async fn update(&self, id: NpcId, patch: &NpcPatch) -> Result<Option<Npc>, RecordStoreError>;

    async fn delete(&self, id: NpcId) -> Result<bool, RecordStoreError>;
}

// =============================================================================
// Combat History Record Port
// =============================================================================

#[async_trait]
pub trait HistoryRecordPort: Send + Sync {
    /// Newest first
    async fn get_all(&self) -> Result<Vec<CombatHistory>, RecordStoreError>;

    async fn create(&self, record: &CombatHistory) -> Result<CombatHistory, RecordStoreError>;

    async fn update_title(
        &self,
        id: HistoryId,
        title: &str,
    ) -> Result<Option<CombatHistory>, RecordStoreError>;

    async fn delete(&self, id: HistoryId) -> Result<bool, RecordStoreError>;
}
