//! Domain entities - Core business objects with identity

mod character;
mod combatant;
mod history;
mod log_entry;

pub use character::{
    Character, NewNpc, Npc, NpcKind, NpcPatch, RosterPatch, StoredCharacter,
};
pub use combatant::{Combatant, CombatantPatch, HitPoints, NewCombatant};
pub use history::{CombatHistory, UNTITLED_COMBAT};
pub use log_entry::{CombatLogEntry, LogEntryType, DUPLICATE_WINDOW_MS};
