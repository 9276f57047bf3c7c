//! Combat State - the encounter aggregate root
//!
//! Holds the combatant store, the turn/round scheduler, the live log and the
//! archive of finished encounters. The whole value is what gets persisted and
//! pushed to viewers, so it serializes with the camel-case snapshot names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::entities::{
    CombatHistory, CombatLogEntry, Combatant, CombatantPatch, NewCombatant,
};
use crate::domain::error::DomainError;
use crate::domain::events::CombatEvent;
use crate::domain::services::Resolution;
use crate::domain::value_objects::{CombatantId, HistoryId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatPhase {
    #[default]
    Setup,
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatState {
    pub combatants: Vec<Combatant>,
    pub phase: CombatPhase,
    /// Index into [`CombatState::initiative_order`]
    pub current_turn: usize,
    pub round: u32,
    /// Newest first
    pub log_entries: Vec<CombatLogEntry>,
    /// Newest first
    #[serde(default)]
    pub history: Vec<CombatHistory>,
    /// Bumped on every change
    #[serde(default)]
    pub version: u64,
    /// RFC 3339 on write; epoch milliseconds are also accepted on read
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_last_updated"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(DateTime<Utc>),
}

fn deserialize_last_updated<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Text(at)) => Ok(Some(at)),
        Some(RawTimestamp::Millis(ms)) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
    }
}

impl Default for CombatState {
    fn default() -> Self {
        Self {
            combatants: Vec::new(),
            phase: CombatPhase::Setup,
            current_turn: 0,
            round: 1,
            log_entries: Vec::new(),
            history: Vec::new(),
            version: 0,
            last_updated: None,
        }
    }
}

impl CombatState {
    // ========================================================================
    // Combatant store
    // ========================================================================

    pub fn find_combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// Add a combatant with a fresh id. Joining mid-fight is announced.
    pub fn add_combatant(
        &mut self,
        fields: NewCombatant,
        now: DateTime<Utc>,
    ) -> Result<CombatantId, DomainError> {
        fields.validate()?;
        let id = CombatantId::new();
        let combatant = fields.into_combatant(id);
        if self.phase == CombatPhase::Active {
            self.log_event(
                CombatEvent::Joined {
                    name: combatant.name.clone(),
                },
                None,
                now,
            );
        }
        self.combatants.push(combatant);
        Ok(id)
    }

    /// Merge `patch` into the combatant. No clamping is performed here.
    pub fn update_combatant(&mut self, id: CombatantId, patch: CombatantPatch) -> bool {
        match self.combatants.iter_mut().find(|c| c.id == id) {
            Some(combatant) => {
                combatant.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove_combatant(&mut self, id: CombatantId) -> bool {
        let before = self.combatants.len();
        self.combatants.retain(|c| c.id != id);
        if self.combatants.len() == before {
            return false;
        }
        if self.current_turn >= self.combatants.len() {
            self.current_turn = 0;
        }
        true
    }

    // ========================================================================
    // Turn/round scheduler
    // ========================================================================

    /// Highest initiative first; ties keep insertion order.
    pub fn initiative_order(&self) -> Vec<&Combatant> {
        let mut order: Vec<&Combatant> = self.combatants.iter().collect();
        order.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        order
    }

    pub fn current_combatant(&self) -> Option<&Combatant> {
        self.initiative_order().get(self.current_turn).copied()
    }

    pub fn start_combat(&mut self) -> Result<(), DomainError> {
        if self.phase == CombatPhase::Active {
            return Err(DomainError::invalid_transition("Combat is already active"));
        }
        if self.combatants.is_empty() {
            return Err(DomainError::invalid_transition(
                "Cannot start combat without combatants",
            ));
        }
        self.phase = CombatPhase::Active;
        self.current_turn = 0;
        self.round = 1;
        Ok(())
    }

    /// Pass the turn to the next combatant, wrapping into a new round.
    pub fn advance_turn(&mut self, now: DateTime<Utc>) -> bool {
        let count = self.combatants.len();
        if count == 0 {
            return false;
        }
        if self.current_turn + 1 >= count {
            self.current_turn = 0;
            self.round += 1;
            self.log_event(CombatEvent::RoundStart { round: self.round }, None, now);
        } else {
            self.current_turn += 1;
            let next = self.initiative_order()[self.current_turn];
            let (id, name) = (next.id, next.name.clone());
            self.log_event(CombatEvent::TurnAdvance { combatant: name }, Some(id), now);
        }
        true
    }

    // ========================================================================
    // Combat log
    // ========================================================================

    /// Prepend an entry unless it repeats the newest one within the window.
    pub fn push_log(&mut self, entry: CombatLogEntry) -> bool {
        if let Some(newest) = self.log_entries.first() {
            if entry.is_duplicate_of(newest) {
                tracing::debug!(text = %entry.text, "Dropping duplicate log entry");
                return false;
            }
        }
        self.log_entries.insert(0, entry);
        true
    }

    pub fn log_event(
        &mut self,
        event: CombatEvent,
        source_id: Option<CombatantId>,
        now: DateTime<Utc>,
    ) -> bool {
        self.push_log(CombatLogEntry::from_event(event, source_id, now))
    }

    pub fn clear_log(&mut self) -> bool {
        if self.log_entries.is_empty() {
            return false;
        }
        self.log_entries.clear();
        true
    }

    // ========================================================================
    // Resolutions
    // ========================================================================

    /// Apply a resolved action: all patches, then its log lines in order.
    pub fn apply(&mut self, resolution: Resolution, now: DateTime<Utc>) -> bool {
        if resolution.is_empty() {
            return false;
        }
        for (id, patch) in resolution.patches {
            self.update_combatant(id, patch);
        }
        for (event, source_id) in resolution.events {
            self.log_event(event, source_id, now);
        }
        true
    }

    // ========================================================================
    // Archive
    // ========================================================================

    /// Archive the running encounter and reset to setup. History survives.
    pub fn end_combat(&mut self, now: DateTime<Utc>) -> Option<HistoryId> {
        if self.phase != CombatPhase::Active || self.combatants.is_empty() {
            return None;
        }
        let record = CombatHistory::archive(
            std::mem::take(&mut self.combatants),
            std::mem::take(&mut self.log_entries),
            self.round,
            now,
        );
        let id = record.id;
        let mut history = std::mem::take(&mut self.history);
        history.insert(0, record);
        *self = Self {
            history,
            version: self.version,
            last_updated: self.last_updated,
            ..Self::default()
        };
        Some(id)
    }

    pub fn find_history(&self, id: HistoryId) -> Option<&CombatHistory> {
        self.history.iter().find(|h| h.id == id)
    }

    pub fn rename_history(&mut self, id: HistoryId, title: &str) -> Result<(), DomainError> {
        self.history
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| DomainError::not_found("CombatHistory", id.to_string()))?
            .rename(title)
    }

    pub fn delete_history(&mut self, id: HistoryId) -> bool {
        let before = self.history.len();
        self.history.retain(|h| h.id != id);
        self.history.len() != before
    }

    /// Clear the live encounter. History survives.
    pub fn reset(&mut self) {
        let history = std::mem::take(&mut self.history);
        *self = Self {
            history,
            version: self.version,
            last_updated: self.last_updated,
            ..Self::default()
        };
    }

    /// Record that the state changed at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.last_updated = Some(now);
    }

    /// Whether `other` was written after this state (last writer wins).
    pub fn is_superseded_by(&self, other: &CombatState) -> bool {
        match (self.last_updated, other.last_updated) {
            (Some(ours), Some(theirs)) => theirs > ours,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LogEntryType;
    use crate::domain::services::{resolve_attack, AttackAction};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn encounter(initiatives: &[(&str, i32, bool)]) -> CombatState {
        let mut state = CombatState::default();
        for (name, initiative, is_player) in initiatives {
            let mut fields = NewCombatant::new(*name, 10, 12).with_initiative(*initiative);
            fields.is_player = *is_player;
            state.add_combatant(fields, now()).unwrap();
        }
        state
    }

    #[test]
    fn test_initiative_order_is_stable_descending() {
        let state = encounter(&[("A", 10, true), ("B", 15, false), ("C", 10, false), ("D", -2, false)]);
        let names: Vec<&str> = state.initiative_order().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn test_advance_turn_wraps_into_new_round() {
        let mut state = encounter(&[("A", 20, true), ("B", 10, false), ("C", 5, false)]);
        state.start_combat().unwrap();
        state.current_turn = 2;
        assert!(state.advance_turn(now()));
        assert_eq!(state.current_turn, 0);
        assert_eq!(state.round, 2);
        assert_eq!(state.log_entries[0].text, "Round 2 begins");
        assert_eq!(state.log_entries[0].entry_type, LogEntryType::Round);
    }

    #[test]
    fn test_advance_turn_announces_next_combatant() {
        let mut state = encounter(&[("A", 20, true), ("B", 10, false)]);
        state.start_combat().unwrap();
        state.advance_turn(now());
        assert_eq!(state.current_turn, 1);
        assert_eq!(state.log_entries[0].text, "B's turn");
        assert_eq!(state.log_entries[0].entry_type, LogEntryType::Turn);
        assert_eq!(state.current_combatant().unwrap().name, "B");
    }

    #[test]
    fn test_advance_turn_on_empty_encounter_is_noop() {
        let mut state = CombatState::default();
        assert!(!state.advance_turn(now()));
        assert_eq!(state, CombatState::default());
    }

    #[test]
    fn test_start_combat_requires_combatants() {
        let mut state = CombatState::default();
        assert!(matches!(
            state.start_combat(),
            Err(DomainError::InvalidStateTransition(_))
        ));
        let mut state = encounter(&[("A", 1, true)]);
        state.start_combat().unwrap();
        assert_eq!(state.phase, CombatPhase::Active);
        assert!(state.start_combat().is_err());
    }

    #[test]
    fn test_joining_mid_fight_is_logged() {
        let mut state = encounter(&[("A", 1, true)]);
        state.start_combat().unwrap();
        state
            .add_combatant(NewCombatant::new("Owlbear", 59, 13), now())
            .unwrap();
        assert_eq!(state.log_entries[0].text, "Owlbear joined the combat!");
    }

    #[test]
    fn test_log_dedup_window() {
        let mut state = CombatState::default();
        let event = CombatEvent::RoundStart { round: 2 };
        assert!(state.log_event(event.clone(), None, now()));
        assert!(!state.log_event(event.clone(), None, now() + Duration::milliseconds(500)));
        assert_eq!(state.log_entries.len(), 1);
        assert!(state.log_event(event, None, now() + Duration::seconds(1)));
        assert_eq!(state.log_entries.len(), 2);
    }

    #[test]
    fn test_update_and_remove_unknown_id_are_noops() {
        let mut state = encounter(&[("A", 1, true)]);
        let snapshot = state.clone();
        assert!(!state.update_combatant(CombatantId::new(), CombatantPatch::current_hp(1)));
        assert!(!state.remove_combatant(CombatantId::new()));
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_remove_keeps_turn_index_in_range() {
        let mut state = encounter(&[("A", 3, true), ("B", 2, false)]);
        state.start_combat().unwrap();
        state.current_turn = 1;
        let b = state.initiative_order()[1].id;
        assert!(state.remove_combatant(b));
        assert_eq!(state.current_turn, 0);
    }

    #[test]
    fn test_apply_logs_knockout_after_hit() {
        let mut state = encounter(&[("Alice", 10, true), ("Goblin", 5, false)]);
        state.start_combat().unwrap();
        let goblin = state.initiative_order()[1].id;
        let resolution = resolve_attack(
            &state,
            &AttackAction {
                source_id: None,
                target_ids: vec![goblin],
                roll: 18,
                damage: Some(10),
                status: None,
            },
        );
        assert!(state.apply(resolution, now()));
        let texts: Vec<&str> = state.log_entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Goblin falls unconscious!", "Alice hit Goblin for 10 damage (Attack: 18)"]
        );
        assert_eq!(state.find_combatant(goblin).unwrap().current_hp, 0);
    }

    #[test]
    fn test_end_combat_archives_and_resets() {
        let mut state = encounter(&[("A", 3, true), ("B", 2, false), ("C", 1, false)]);
        state.start_combat().unwrap();
        state.advance_turn(now());
        state.touch(now());

        let id = state.end_combat(now()).unwrap();
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.phase, CombatPhase::Setup);
        assert!(state.combatants.is_empty());
        assert!(state.log_entries.is_empty());
        assert_eq!(state.round, 1);
        assert_eq!(state.version, 1);

        let record = state.find_history(id).unwrap();
        assert_eq!(record.title, "A vs B, C");
        assert_eq!(record.combatants.len(), 3);
        assert_eq!(record.log_entries.len(), 1);
    }

    #[test]
    fn test_end_combat_without_active_encounter_is_noop() {
        let mut state = CombatState::default();
        state.phase = CombatPhase::Active;
        assert!(state.end_combat(now()).is_none());
        assert!(state.history.is_empty());

        let mut state = encounter(&[("A", 1, true)]);
        assert!(state.end_combat(now()).is_none());
        assert_eq!(state.combatants.len(), 1);
    }

    #[test]
    fn test_history_rename_and_delete() {
        let mut state = encounter(&[("A", 1, true)]);
        state.start_combat().unwrap();
        let id = state.end_combat(now()).unwrap();

        state.rename_history(id, "Bridge ambush").unwrap();
        assert_eq!(state.find_history(id).unwrap().title, "Bridge ambush");
        assert!(matches!(
            state.rename_history(HistoryId::new(), "x"),
            Err(DomainError::NotFound { .. })
        ));
        assert!(state.delete_history(id));
        assert!(!state.delete_history(id));
    }

    #[test]
    fn test_snapshot_wire_names_round_trip() {
        let mut state = encounter(&[("A", 1, true)]);
        state.start_combat().unwrap();
        state.touch(now());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"], "active");
        assert_eq!(json["currentTurn"], 0);
        assert!(json["logEntries"].is_array());
        assert_eq!(json["lastUpdated"], "2023-11-14T22:13:20Z");
        let back: CombatState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut ours = CombatState::default();
        let mut theirs = CombatState::default();
        assert!(!ours.is_superseded_by(&theirs));
        theirs.touch(now());
        assert!(ours.is_superseded_by(&theirs));
        ours.touch(now());
        assert!(!ours.is_superseded_by(&theirs));
    }
}
