//! Domain services - Pure combat rules that span several entities

pub mod action_resolver;
pub mod stats;

pub use action_resolver::{
    resolve_afflict, resolve_attack, resolve_heal, resolve_remove_condition, resolve_save,
    resolve_set_hp, resolve_set_temp_hp, resolve_temp_hp, AttackAction, Resolution, SaveAction,
    SupportAction, UNKNOWN_SOURCE,
};
pub use stats::{CombatStats, Tally};
