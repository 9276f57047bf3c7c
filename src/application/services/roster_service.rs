//! Roster Service - saved player characters
//!
//! The roster is one JSON list in the snapshot store. It is read once and
//! cached; every change writes the whole list back.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::application::ports::outbound::RosterStorePort;
use crate::application::services::CombatService;
use crate::domain::entities::Character;
use crate::domain::error::DomainError;
use crate::domain::value_objects::CombatantId;

pub struct RosterService {
    store: Arc<dyn RosterStorePort>,
    cache: RwLock<Option<Vec<Character>>>,
    combat: Arc<CombatService>,
}

impl RosterService {
    pub fn new(store: Arc<dyn RosterStorePort>, combat: Arc<CombatService>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
            combat,
        }
    }

    /// Saved characters (cached)
    pub async fn list(&self) -> Result<Vec<Character>> {
        if let Some(roster) = &*self.cache.read().await {
            return Ok(roster.clone());
        }
        let mut cache = self.cache.write().await;
        Ok(self.loaded(&mut cache).await?.clone())
    }

    #[instrument(skip(self, character), fields(name = %character.name))]
    pub async fn add(&self, character: Character) -> Result<Character> {
        character.validate()?;
        let mut cache = self.cache.write().await;
        let mut roster = self.loaded(&mut cache).await?.clone();
        if roster.iter().any(|c| c.name == character.name) {
            return Err(DomainError::conflict(format!(
                "A character named '{}' is already saved",
                character.name
            ))
            .into());
        }
        roster.push(character.clone());
        self.save(&mut cache, roster).await?;
        info!("Saved character");
        Ok(character)
    }

    /// Replace the character saved as `old_name`. Renaming onto another
    /// saved name is rejected.
    #[instrument(skip(self, character), fields(new_name = %character.name))]
    pub async fn update(&self, old_name: &str, character: Character) -> Result<Character> {
        character.validate()?;
        let mut cache = self.cache.write().await;
        let mut roster = self.loaded(&mut cache).await?.clone();
        let index = roster
            .iter()
            .position(|c| c.name == old_name)
            .ok_or_else(|| DomainError::not_found("Character", old_name))?;
        if character.name != old_name && roster.iter().any(|c| c.name == character.name) {
            return Err(DomainError::conflict(format!(
                "A character named '{}' is already saved",
                character.name
            ))
            .into());
        }
        roster[index] = character.clone();
        self.save(&mut cache, roster).await?;
        info!("Updated saved character");
        Ok(character)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let mut cache = self.cache.write().await;
        let mut roster = self.loaded(&mut cache).await?.clone();
        let before = roster.len();
        roster.retain(|c| c.name != name);
        if roster.len() == before {
            return Ok(false);
        }
        self.save(&mut cache, roster).await?;
        info!("Deleted saved character");
        Ok(true)
    }

    /// Put a saved character into the encounter as a player at full HP.
    #[instrument(skip(self))]
    pub async fn add_to_encounter(&self, name: &str) -> Result<CombatantId> {
        let roster = self.list().await?;
        let character = roster
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DomainError::not_found("Character", name))?;
        self.combat.add_combatant(character.to_combatant(true)).await
    }

    /// The cached roster, loading it on first use. Callers hold the write
    /// guard for the whole read-check-save sequence.
    async fn loaded<'a>(
        &self,
        cache: &'a mut Option<Vec<Character>>,
    ) -> Result<&'a mut Vec<Character>> {
        if cache.is_none() {
            let roster = self
                .store
                .load_roster()
                .await
                .context("Failed to load saved characters")?;
            *cache = Some(roster);
        }
        Ok(cache.get_or_insert_with(Vec::new))
    }

    async fn save(&self, cache: &mut Option<Vec<Character>>, roster: Vec<Character>) -> Result<()> {
        self.store
            .save_roster(&roster)
            .await
            .context("Failed to save characters")?;
        *cache = Some(roster);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::SnapshotError;
    use crate::domain::aggregates::CombatState;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRoster {
        saved: Mutex<Vec<Character>>,
    }

    #[async_trait]
    impl RosterStorePort for MemoryRoster {
        async fn load_roster(&self) -> Result<Vec<Character>, SnapshotError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn save_roster(&self, roster: &[Character]) -> Result<(), SnapshotError> {
            tokio::task::yield_now().await;
            *self.saved.lock().unwrap() = roster.to_vec();
            Ok(())
        }
    }

    fn services() -> (RosterService, Arc<MemoryRoster>, Arc<CombatService>) {
        let store = Arc::new(MemoryRoster::default());
        let combat = Arc::new(CombatService::new(
            CombatState::default(),
            Arc::new(FixedClock(DateTime::from_timestamp(1_700_000_000, 0).unwrap())),
            Arc::new(FixedRandom(10)),
            None,
        ));
        (
            RosterService::new(store.clone(), combat.clone()),
            store,
            combat,
        )
    }

    fn is_conflict(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Conflict(_)))
    }

    #[tokio::test]
    async fn test_add_persists_and_rejects_duplicates() {
        let (roster, store, _) = services();
        roster.add(Character::new("Aria", 24, 16)).await.unwrap();
        assert_eq!(store.saved.lock().unwrap().len(), 1);

        let err = roster.add(Character::new("Aria", 30, 12)).await.unwrap_err();
        assert!(is_conflict(&err));
        assert_eq!(roster.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_names_unique() {
        let (roster, store, _) = services();
        let (first, second) = tokio::join!(
            roster.add(Character::new("Aria", 24, 16)),
            roster.add(Character::new("Aria", 30, 12)),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let err = first.err().or(second.err()).unwrap();
        assert!(is_conflict(&err));
        assert_eq!(store.saved.lock().unwrap().len(), 1);
        assert_eq!(roster.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_by_old_name() {
        let (roster, _, _) = services();
        roster.add(Character::new("Aria", 24, 16)).await.unwrap();
        roster.add(Character::new("Bram", 30, 18)).await.unwrap();

        let err = roster
            .update("Aria", Character::new("Bram", 24, 16))
            .await
            .unwrap_err();
        assert!(is_conflict(&err));

        roster
            .update("Aria", Character::new("Aria the Bold", 26, 16).with_initiative(3))
            .await
            .unwrap();
        let names: Vec<String> = roster.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Aria the Bold".to_string(), "Bram".to_string()]);

        assert!(roster.update("Nobody", Character::new("X", 1, 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let (roster, _, _) = services();
        roster.add(Character::new("Aria", 24, 16)).await.unwrap();
        assert!(!roster.delete("Bram").await.unwrap());
        assert!(roster.delete("Aria").await.unwrap());
        assert!(roster.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_to_encounter_at_full_hp_as_player() {
        let (roster, _, combat) = services();
        roster
            .add(Character::new("Aria", 24, 16).with_initiative(14))
            .await
            .unwrap();
        let id = roster.add_to_encounter("Aria").await.unwrap();

        let state = combat.snapshot().await;
        let combatant = state.find_combatant(id).unwrap();
        assert!(combatant.is_player);
        assert_eq!(combatant.current_hp, 24);
        assert_eq!(combatant.initiative, 14);
        assert!(roster.add_to_encounter("Bram").await.is_err());
    }
}
