//! Application services - Use case implementations
//!
//! Each service wraps the domain behind outbound ports and is shared through
//! `AppState` as an `Arc`.

pub mod combat_service;
pub mod record_service;
pub mod roster_service;

pub use combat_service::CombatService;
pub use record_service::RecordService;
pub use roster_service::RosterService;
