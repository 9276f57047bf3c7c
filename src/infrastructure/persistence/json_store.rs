//! JSON snapshot store
//!
//! One file per key inside the data directory. Writes go to a temporary file
//! that is renamed over the old one, so readers in other processes never see
//! a half-written snapshot.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use crate::application::ports::outbound::{CombatSnapshotPort, RosterStorePort, SnapshotError};
use crate::domain::aggregates::CombatState;
use crate::domain::entities::Character;

const COMBAT_STATE_KEY: &str = "combatState";
const SAVED_CHARACTERS_KEY: &str = "savedCharacters";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SnapshotError> {
        match fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let target = self.path(key);
        let staging = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &target).await?;
        Ok(())
    }
}

#[async_trait]
impl CombatSnapshotPort for JsonFileStore {
    async fn load_combat(&self) -> Result<Option<CombatState>, SnapshotError> {
        self.read(COMBAT_STATE_KEY).await
    }

    async fn save_combat(&self, state: &CombatState) -> Result<(), SnapshotError> {
        self.write(COMBAT_STATE_KEY, state).await
    }
}

#[async_trait]
impl RosterStorePort for JsonFileStore {
    async fn load_roster(&self) -> Result<Vec<Character>, SnapshotError> {
        Ok(self.read(SAVED_CHARACTERS_KEY).await?.unwrap_or_default())
    }

    async fn save_roster(&self, roster: &[Character]) -> Result<(), SnapshotError> {
        self.write(SAVED_CHARACTERS_KEY, roster).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewCombatant;
    use crate::domain::services::CombatStats;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested")).await.unwrap();
        assert!(store.load_combat().await.unwrap().is_none());
        assert!(store.load_roster().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_combat_state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let mut state = CombatState::default();
        state
            .add_combatant(NewCombatant::new("Aria", 24, 16).as_player(), now)
            .unwrap();
        state.touch(now);
        store.save_combat(&state).await.unwrap();

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load_combat().await.unwrap(), Some(state));

        let raw = std::fs::read_to_string(dir.path().join("combatState.json")).unwrap();
        assert!(raw.contains("\"maxHP\": 24"));
        assert!(raw.contains("\"lastUpdated\""));
    }

    #[tokio::test]
    async fn test_roster_is_replaced_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .save_roster(&[Character::new("Aria", 24, 16), Character::new("Bram", 30, 18)])
            .await
            .unwrap();
        store.save_roster(&[Character::new("Bram", 30, 18)]).await.unwrap();

        let roster = store.load_roster().await.unwrap();
        assert_eq!(roster, vec![Character::new("Bram", 30, 18)]);
    }

    const BROWSER_SNAPSHOT: &str = r#"{
        "combatants": [
            {"id": "1700000000000", "name": "Aria", "maxHP": 24, "currentHP": 20,
             "ac": 16, "initiative": 18, "isPlayer": true},
            {"id": "1700000000001", "name": "Goblin", "maxHP": 9, "currentHP": 0,
             "tempHP": 0, "ac": 13, "initiative": 12, "isPlayer": false, "conditions": []},
            {"id": "1700000000002", "name": "Orc", "maxHP": 15, "currentHP": 11,
             "tempHP": 0, "ac": 13, "initiative": 9, "isPlayer": false}
        ],
        "phase": "active",
        "currentTurn": 0,
        "round": 2,
        "activeSave": {"type": "dex", "dc": 13, "successes": [], "targets": [],
                       "halfDamageOnSave": false, "damage": 0},
        "lastUpdated": 1700000004000,
        "logEntries": [
            {"id": "1700000003000-k3j4h5g6f", "timestamp": "2023-11-14T22:13:23.000Z",
             "text": "Aria hit Goblin for 9 damage (Attack: 17)", "type": "damage"},
            {"id": "1700000002900-a8s7d6f5g", "timestamp": "2023-11-14T22:13:22.900Z",
             "text": "Goblin falls unconscious!", "type": "damage"},
            {"id": "1700000002000-q1w2e3r4t", "timestamp": "2023-11-14T22:13:22.000Z",
             "text": "Orc failed their DEX save taking 4 damage", "type": "damage"},
            {"id": "1700000001000-z9x8c7v6b", "timestamp": "2023-11-14T22:13:21.000Z",
             "text": "Aria's turn", "type": "turn"},
            {"id": "1700000000500-m5n4b3v2c", "timestamp": "2023-11-14T22:13:20.500Z",
             "text": "Round 2 begins", "type": "round"}
        ],
        "history": [
            {"id": "1699999999999", "title": "Aria vs Bandit", "date": "2023-11-14T20:00:00.000Z",
             "combatants": [], "logEntries": [], "rounds": 3,
             "stats": {"damageDealt": {"Aria": 12}, "damageTaken": {}, "healingDone": {},
                       "healingReceived": {}, "hits": {"Aria": 2}, "misses": {},
                       "savingThrowsForced": {}, "savingThrowsMade": {},
                       "savingThrowsFailed": {}, "kills": {"Aria": 1}, "knockouts": {}}}
        ]
    }"#;

    #[tokio::test]
    async fn test_browser_snapshot_loads_and_yields_stats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("combatState.json"), BROWSER_SNAPSHOT).unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        let state = store.load_combat().await.unwrap().unwrap();
        assert_eq!(state.combatants.len(), 3);
        assert_eq!(state.combatants[0].temp_hp, 0);
        assert_eq!(
            state.last_updated,
            DateTime::from_timestamp_millis(1_700_000_004_000)
        );
        assert_eq!(state.history[0].title, "Aria vs Bandit");
        assert_eq!(state.history[0].stats.kills["Aria"], 1);

        let stats = CombatStats::from_log(&state.log_entries);
        assert_eq!(stats.damage_dealt["Aria"], 13);
        assert_eq!(stats.damage_taken["Goblin"], 9);
        assert_eq!(stats.damage_taken["Orc"], 4);
        assert_eq!(stats.hits["Aria"], 1);
        assert_eq!(stats.saving_throws_forced["Aria"], 1);
        assert_eq!(stats.saving_throws_failed["Orc"], 1);
        assert_eq!(stats.knockouts["Goblin"], 1);
        assert_eq!(stats.kills["Aria"], 1);

        // Reloading keeps the mapped ids stable
        let again = store.load_combat().await.unwrap().unwrap();
        assert_eq!(again.combatants[0].id, state.combatants[0].id);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("combatState.json"), "{not json").unwrap();
        assert!(matches!(
            store.load_combat().await,
            Err(SnapshotError::Serialization(_))
        ));
    }
}
