//! Outbound ports - Interfaces that the application requires from external systems

mod clock_port;
mod record_store_port;
mod snapshot_port;

pub use clock_port::{ClockPort, RandomPort};
pub use record_store_port::{
    CharacterRecordPort, HistoryRecordPort, NpcRecordPort, RecordStoreError,
};
pub use snapshot_port::{CombatSnapshotPort, RosterStorePort, SnapshotError};
