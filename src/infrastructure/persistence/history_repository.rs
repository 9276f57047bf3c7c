//! SQLite backup of archived encounters
//!
//! Combatants, log and stats are stored as JSON columns; only the title is
//! ever updated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::application::ports::outbound::{HistoryRecordPort, RecordStoreError};
use crate::domain::entities::CombatHistory;
use crate::domain::value_objects::HistoryId;

type HistoryRow = (String, String, DateTime<Utc>, i64, String, String, String);

const SELECT_COLUMNS: &str =
    "SELECT id, title, date, rounds, combatants, log_entries, stats FROM combat_history";

pub struct SqliteHistoryRepository {
    pool: SqlitePool,
}

impl SqliteHistoryRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS combat_history (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                date TIMESTAMP NOT NULL,
                rounds INTEGER NOT NULL,
                combatants TEXT NOT NULL,
                log_entries TEXT NOT NULL,
                stats TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn find(&self, id: HistoryId) -> Result<Option<CombatHistory>, RecordStoreError> {
        let row: Option<HistoryRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        row.map(from_row).transpose()
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RecordStoreError> {
    serde_json::to_string(value).map_err(|e| RecordStoreError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RecordStoreError> {
    serde_json::from_str(raw).map_err(|e| RecordStoreError::Serialization(e.to_string()))
}

fn from_row(
    (id, title, date, rounds, combatants, log_entries, stats): HistoryRow,
) -> Result<CombatHistory, RecordStoreError> {
    Ok(CombatHistory {
        id: id
            .parse()
            .map_err(|e| RecordStoreError::Serialization(format!("bad history id: {}", e)))?,
        title,
        date,
        combatants: from_json(&combatants)?,
        log_entries: from_json(&log_entries)?,
        rounds: rounds as u32,
        stats: from_json(&stats)?,
    })
}

#[async_trait]
impl HistoryRecordPort for SqliteHistoryRepository {
    async fn get_all(&self) -> Result<Vec<CombatHistory>, RecordStoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!("{} ORDER BY date DESC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        rows.into_iter().map(from_row).collect()
    }

    async fn create(&self, record: &CombatHistory) -> Result<CombatHistory, RecordStoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO combat_history \
                (id, title, date, rounds, combatants, log_entries, stats) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.title)
        .bind(record.date)
        .bind(i64::from(record.rounds))
        .bind(to_json(&record.combatants)?)
        .bind(to_json(&record.log_entries)?)
        .bind(to_json(&record.stats)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RecordStoreError::Database(e.to_string()))?;

        Ok(record.clone())
    }

    async fn update_title(
        &self,
        id: HistoryId,
        title: &str,
    ) -> Result<Option<CombatHistory>, RecordStoreError> {
        let result = sqlx::query("UPDATE combat_history SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn delete(&self, id: HistoryId) -> Result<bool, RecordStoreError> {
        let result = sqlx::query("DELETE FROM combat_history WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
