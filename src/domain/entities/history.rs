//! Archived encounters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{CombatLogEntry, Combatant};
use crate::domain::error::DomainError;
use crate::domain::services::CombatStats;
use crate::domain::value_objects::HistoryId;

pub const UNTITLED_COMBAT: &str = "Untitled Combat";

/// A frozen record of a finished encounter. Only the title may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatHistory {
    pub id: HistoryId,
    pub title: String,
    pub date: DateTime<Utc>,
    pub combatants: Vec<Combatant>,
    pub log_entries: Vec<CombatLogEntry>,
    pub rounds: u32,
    pub stats: CombatStats,
}

impl CombatHistory {
    /// Archive an encounter, deriving its title and stats.
    pub fn archive(
        combatants: Vec<Combatant>,
        log_entries: Vec<CombatLogEntry>,
        rounds: u32,
        date: DateTime<Utc>,
    ) -> Self {
        let stats = CombatStats::from_log(&log_entries);
        Self {
            id: HistoryId::new(),
            title: Self::default_title(&combatants),
            date,
            combatants,
            log_entries,
            rounds,
            stats,
        }
    }

    /// "Players vs everyone else", e.g. `"Aria, Brom vs Goblin, Orc"`.
    pub fn default_title(combatants: &[Combatant]) -> String {
        let (players, others): (Vec<&Combatant>, Vec<&Combatant>) =
            combatants.iter().partition(|c| c.is_player);
        if players.is_empty() && others.is_empty() {
            return UNTITLED_COMBAT.to_string();
        }
        let join = |list: Vec<&Combatant>| {
            list.iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{} vs {}", join(players), join(others))
    }

    pub fn rename(&mut self, title: &str) -> Result<(), DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("Combat title cannot be empty"));
        }
        self.title = title.to_string();
        Ok(())
    }
}
