//! Domain layer - Combat rules with no I/O
//!
//! This layer contains:
//! - Entities: Combatant, CombatLogEntry, CombatHistory, roster characters and NPCs
//! - Value Objects: typed ids, saving throw abilities
//! - Aggregates: CombatState, the encounter root
//! - Events: structured combat events and their narration
//! - Domain Services: action resolution and stats aggregation

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod events;
pub mod services;
pub mod value_objects;
