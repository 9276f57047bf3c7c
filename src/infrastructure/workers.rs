//! Background workers around the shared combat state
//!
//! - push every committed state to connected viewers
//! - write every committed state to the snapshot store
//! - poll the snapshot store for newer states written by other processes

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::outbound::CombatSnapshotPort;
use crate::application::services::CombatService;
use crate::infrastructure::state::AppState;
use crate::infrastructure::websocket::ServerMessage;

/// Worker that pushes each new combat state to every viewer
pub async fn viewer_push_worker(state: Arc<AppState>) {
    tracing::info!("Starting viewer push worker");
    let mut changes = state.combat.subscribe();
    while changes.changed().await.is_ok() {
        let snapshot = changes.borrow_and_update().clone();
        let message = ServerMessage::CombatStateUpdated {
            state: (*snapshot).clone(),
        };
        let viewers = state.viewers.read().await;
        tracing::debug!(
            version = snapshot.version,
            viewers = viewers.count(),
            "Pushing combat state"
        );
        viewers.broadcast(&message);
    }
    tracing::info!("Viewer push worker stopped");
}

/// Worker that saves each new combat state. Intermediate states are skipped
/// when writes fall behind; the latest one is always written.
pub async fn persistence_worker(combat: Arc<CombatService>, store: Arc<dyn CombatSnapshotPort>) {
    tracing::info!("Starting persistence worker");
    let mut changes = combat.subscribe();
    while changes.changed().await.is_ok() {
        let snapshot = changes.borrow_and_update().clone();
        if let Err(e) = store.save_combat(&snapshot).await {
            tracing::error!(version = snapshot.version, "Failed to save combat state: {}", e);
        }
    }
    tracing::info!("Persistence worker stopped");
}

/// Worker that adopts snapshots written by other processes (last writer wins)
pub async fn sync_worker(
    combat: Arc<CombatService>,
    store: Arc<dyn CombatSnapshotPort>,
    poll_interval: Duration,
) {
    tracing::info!("Starting sync worker ({:?} interval)", poll_interval);
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match store.load_combat().await {
            Ok(Some(snapshot)) => {
                combat.adopt_if_newer(snapshot).await;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to poll combat snapshot: {}", e),
        }
    }
}
