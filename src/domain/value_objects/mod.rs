//! Value objects - Immutable objects defined by their attributes

mod ids;
mod save_ability;

pub use ids::*;
pub use save_ability::SaveAbility;
