//! Domain events - Structured records of what happened during combat

pub mod combat_events;

pub use combat_events::{CombatEvent, TARGET_SEPARATOR};
