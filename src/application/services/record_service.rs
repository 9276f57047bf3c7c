//! Record Service - stored characters, NPC templates and the history backup
//!
//! The record store is optional storage next to the shared combat state.
//! A failing store is logged and treated as empty so the tracker keeps
//! running.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, instrument};

use crate::application::ports::outbound::{
    CharacterRecordPort, HistoryRecordPort, NpcRecordPort,
};
use crate::application::services::CombatService;
use crate::domain::entities::{
    Character, CombatHistory, NewNpc, Npc, NpcKind, NpcPatch, RosterPatch, StoredCharacter,
};
use crate::domain::error::DomainError;
use crate::domain::value_objects::{CharacterId, CombatantId, HistoryId, NpcId};

pub struct RecordService {
    characters: Arc<dyn CharacterRecordPort>,
    npcs: Arc<dyn NpcRecordPort>,
    history: Arc<dyn HistoryRecordPort>,
    combat: Arc<CombatService>,
}

impl RecordService {
    pub fn new(
        characters: Arc<dyn CharacterRecordPort>,
        npcs: Arc<dyn NpcRecordPort>,
        history: Arc<dyn HistoryRecordPort>,
        combat: Arc<CombatService>,
    ) -> Self {
        Self {
            characters,
            npcs,
            history,
            combat,
        }
    }

    // ========================================================================
    // Characters
    // ========================================================================

    pub async fn list_characters(&self) -> Vec<StoredCharacter> {
        self.characters.get_all().await.unwrap_or_else(|e| {
            error!("Failed to list stored characters: {}", e);
            Vec::new()
        })
    }

    #[instrument(skip(self, character), fields(name = %character.name))]
    pub async fn create_character(&self, character: Character) -> Result<Option<StoredCharacter>> {
        character.validate()?;
        match self.characters.create(&character).await {
            Ok(stored) => {
                info!(character_id = %stored.id, "Stored character");
                Ok(Some(stored))
            }
            Err(e) => {
                error!("Failed to store character: {}", e);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update_character(
        &self,
        id: CharacterId,
        patch: RosterPatch,
    ) -> Option<StoredCharacter> {
        self.characters.update(id, &patch).await.unwrap_or_else(|e| {
            error!("Failed to update stored character: {}", e);
            None
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_character(&self, id: CharacterId) -> bool {
        self.characters.delete(id).await.unwrap_or_else(|e| {
            error!("Failed to delete stored character: {}", e);
            false
        })
    }

    // ========================================================================
    // NPCs
    // ========================================================================

    pub async fn list_npcs(&self, kind: Option<NpcKind>) -> Vec<Npc> {
        self.npcs.get_all(kind).await.unwrap_or_else(|e| {
            error!("Failed to list NPCs: {}", e);
            Vec::new()
        })
    }

    #[instrument(skip(self, npc), fields(name = %npc.name, kind = %npc.kind))]
    pub async fn create_npc(&self, npc: NewNpc) -> Result<Option<Npc>> {
        if npc.name.trim().is_empty() {
            return Err(DomainError::validation("NPC name cannot be empty").into());
        }
        if npc.max_hp == 0 {
            return Err(DomainError::validation("Max HP must be greater than 0").into());
        }
        match self.npcs.create(&npc).await {
            Ok(stored) => {
                info!(npc_id = %stored.id, "Stored NPC");
                Ok(Some(stored))
            }
            Err(e) => {
                error!("Failed to store NPC: {}", e);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update_npc(&self, id: NpcId, patch: NpcPatch) -> Option<Npc> {
        self.npcs.update(id, &patch).await.unwrap_or_else(|e| {
            error!("Failed to update NPC: {}", e);
            None
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_npc(&self, id: NpcId) -> bool {
        self.npcs.delete(id).await.unwrap_or_else(|e| {
            error!("Failed to delete NPC: {}", e);
            false
        })
    }

    /// Put a stored NPC into the encounter at full HP.
    #[instrument(skip(self))]
    pub async fn add_npc_to_encounter(&self, id: NpcId) -> Result<CombatantId> {
        let npc = self
            .list_npcs(None)
            .await
            .into_iter()
            .find(|n| n.id == id)
            .ok_or_else(|| DomainError::not_found("Npc", id.to_string()))?;
        self.combat.add_combatant(npc.to_combatant()).await
    }

    // ========================================================================
    // History backup
    // ========================================================================

    pub async fn list_backed_up_history(&self) -> Vec<CombatHistory> {
        self.history.get_all().await.unwrap_or_else(|e| {
            error!("Failed to list combat history backup: {}", e);
            Vec::new()
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_backed_up_history(&self, id: HistoryId) -> bool {
        self.history.delete(id).await.unwrap_or_else(|e| {
            error!("Failed to delete combat history backup: {}", e);
            false
        })
    }
}
