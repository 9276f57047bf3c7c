//! Aggregates - Cluster of domain objects treated as a single unit

pub mod combat_state;

pub use combat_state::{CombatPhase, CombatState};
