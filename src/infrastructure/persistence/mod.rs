//! Persistence adapters
//!
//! - JSON files for the shared combat snapshot and the saved roster
//! - SQLite record stores for characters, NPC templates and the history
//!   backup

mod character_repository;
mod history_repository;
mod json_store;
mod npc_repository;

pub use character_repository::SqliteCharacterRepository;
pub use history_repository::SqliteHistoryRepository;
pub use json_store::JsonFileStore;
pub use npc_repository::SqliteNpcRepository;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// All record stores over one pool
pub struct RecordStores {
    pub characters: SqliteCharacterRepository,
    pub npcs: SqliteNpcRepository,
    pub history: SqliteHistoryRepository,
}

impl RecordStores {
    /// Open (creating if missing) the database and its tables.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            characters: SqliteCharacterRepository::new(pool.clone()).await?,
            npcs: SqliteNpcRepository::new(pool.clone()).await?,
            history: SqliteHistoryRepository::new(pool).await?,
        })
    }
}

/// Single-connection in-memory database; every connection to
/// `sqlite::memory:` is a separate database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}
