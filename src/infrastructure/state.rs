//! Shared application state

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use crate::application::ports::outbound::CombatSnapshotPort;
use crate::application::services::{CombatService, RecordService, RosterService};
use crate::infrastructure::clock::{SystemClock, ThreadRandom};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::persistence::{JsonFileStore, RecordStores};
use crate::infrastructure::viewers::ViewerRegistry;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    /// Snapshot files shared with other processes using the same data dir
    pub snapshots: Arc<JsonFileStore>,
    /// Connected WebSocket viewers
    pub viewers: RwLock<ViewerRegistry>,
    // Application services
    pub combat: Arc<CombatService>,
    pub roster: RosterService,
    pub records: RecordService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let snapshots = Arc::new(
            JsonFileStore::open(&config.data_dir)
                .await
                .with_context(|| format!("Failed to open data dir {}", config.data_dir.display()))?,
        );

        let initial = match snapshots.load_combat().await {
            Ok(Some(state)) => {
                tracing::info!(
                    version = state.version,
                    combatants = state.combatants.len(),
                    "Restored combat state"
                );
                state
            }
            Ok(None) => Default::default(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable combat snapshot: {}", e);
                Default::default()
            }
        };

        let stores = RecordStores::connect(&config.database_url())
            .await
            .context("Failed to open record store")?;
        let history = Arc::new(stores.history);

        let combat = Arc::new(CombatService::new(
            initial,
            Arc::new(SystemClock),
            Arc::new(ThreadRandom),
            Some(history.clone()),
        ));
        let roster = RosterService::new(snapshots.clone(), combat.clone());
        let records = RecordService::new(
            Arc::new(stores.characters),
            Arc::new(stores.npcs),
            history,
            combat.clone(),
        );

        Ok(Self {
            config,
            snapshots,
            viewers: RwLock::new(ViewerRegistry::new()),
            combat,
            roster,
            records,
        })
    }
}

/// State over a throwaway data dir. Keep the `TempDir` alive for the test.
#[cfg(test)]
pub(crate) async fn test_state() -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        server_port: 0,
        data_dir: dir.path().to_path_buf(),
        database_url: None,
        sync_interval_ms: 1000,
    };
    let state = AppState::new(config).await.unwrap();
    (Arc::new(state), dir)
}
