//! Application configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "COMBAT_TRACKER";

/// Application configuration loaded from `COMBAT_TRACKER_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP/WebSocket server port
    pub server_port: u16,

    /// Directory holding the JSON snapshots and the default database
    pub data_dir: PathBuf,

    /// SQLite record store; defaults to a file inside `data_dir`
    #[serde(default)]
    pub database_url: Option<String>,

    /// How often the persisted snapshot is polled for writes by other
    /// processes
    pub sync_interval_ms: u64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load(environment: Environment) -> Result<Self> {
        Config::builder()
            .set_default("server_port", 3000)?
            .set_default("data_dir", "./data")?
            .set_default("sync_interval_ms", 1000)?
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    #[cfg(test)]
    fn from_map(vars: &[(&str, &str)]) -> Result<Self> {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::load(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            format!(
                "sqlite://{}",
                self.data_dir.join("combat_tracker.db").display()
            )
        })
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }
}
