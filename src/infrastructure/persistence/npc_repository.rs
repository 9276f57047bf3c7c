//! SQLite store for NPC templates

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::application::ports::outbound::{NpcRecordPort, RecordStoreError};
use crate::domain::entities::{NewNpc, Npc, NpcKind, NpcPatch};
use crate::domain::value_objects::NpcId;

type NpcRow = (
    String,
    String,
    i64,
    i64,
    Option<i64>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_COLUMNS: &str =
    "SELECT id, name, max_hp, ac, initiative, kind, created_at, updated_at FROM npcs";

pub struct SqliteNpcRepository {
    pool: SqlitePool,
}

impl SqliteNpcRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS npcs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                max_hp INTEGER NOT NULL,
                ac INTEGER NOT NULL,
                initiative INTEGER,
                kind TEXT NOT NULL CHECK (kind IN ('enemy', 'ally')),
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn find(&self, id: NpcId) -> Result<Option<Npc>, RecordStoreError> {
        let row: Option<NpcRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        row.map(from_row).transpose()
    }
}

fn from_row(
    (id, name, max_hp, ac, initiative, kind, created_at, updated_at): NpcRow,
) -> Result<Npc, RecordStoreError> {
    Ok(Npc {
        id: id
            .parse()
            .map_err(|e| RecordStoreError::Serialization(format!("bad NPC id: {}", e)))?,
        name,
        max_hp: max_hp as u32,
        ac: ac as i32,
        initiative: initiative.map(|i| i as i32),
        kind: kind
            .parse::<NpcKind>()
            .map_err(|e| RecordStoreError::Serialization(e.to_string()))?,
        created_at: Some(created_at),
        updated_at: Some(updated_at),
    })
}

#[async_trait]
impl NpcRecordPort for SqliteNpcRepository {
    async fn get_all(&self, kind: Option<NpcKind>) -> Result<Vec<Npc>, RecordStoreError> {
        let rows: Vec<NpcRow> = match kind {
            Some(kind) => {
                sqlx::query_as::<_, NpcRow>(&format!(
                    "{} WHERE kind = ? ORDER BY created_at, name",
                    SELECT_COLUMNS
                ))
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, NpcRow>(&format!("{} ORDER BY created_at, name", SELECT_COLUMNS))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        rows.into_iter().map(from_row).collect()
    }

    async fn create(&self, npc: &NewNpc) -> Result<Npc, RecordStoreError> {
        let id = NpcId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO npcs (id, name, max_hp, ac, initiative, kind, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&npc.name)
        .bind(i64::from(npc.max_hp))
        .bind(i64::from(npc.ac))
        .bind(npc.initiative.map(i64::from))
        .bind(npc.kind.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RecordStoreError::Database(e.to_string()))?;

        Ok(Npc {
            id,
            name: npc.name.clone(),
            max_hp: npc.max_hp,
            ac: npc.ac,
            initiative: npc.initiative,
            kind: npc.kind,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    async fn update(&self, id: NpcId, patch: &NpcPatch) -> Result<Option<Npc>, RecordStoreError> {
        let result = sqlx::query(
            "UPDATE npcs SET \
                name = COALESCE(?, name), \
                max_hp = COALESCE(?, max_hp), \
                ac = COALESCE(?, ac), \
                initiative = COALESCE(?, initiative), \
                kind = COALESCE(?, kind), \
                updated_at = ? \
             WHERE id = ?",
        )
        .bind(patch.fields.name.as_deref())
        .bind(patch.fields.max_hp.map(i64::from))
        .bind(patch.fields.ac.map(i64::from))
        .bind(patch.fields.initiative.map(i64::from))
        .bind(patch.kind.map(|k| k.as_str()))
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RecordStoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn delete(&self, id: NpcId) -> Result<bool, RecordStoreError> {
        let result = sqlx::query("DELETE FROM npcs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RosterPatch;
    use crate::infrastructure::persistence::memory_pool;

    fn goblin() -> NewNpc {
        NewNpc {
            name: "Goblin".into(),
            max_hp: 7,
            ac: 13,
            initiative: Some(14),
            kind: NpcKind::Enemy,
        }
    }

    #[tokio::test]
    async fn test_filter_by_kind() {
        let repo = SqliteNpcRepository::new(memory_pool().await).await.unwrap();
        repo.create(&goblin()).await.unwrap();
        repo.create(&NewNpc {
            name: "Town Guard".into(),
            max_hp: 11,
            ac: 16,
            initiative: None,
            kind: NpcKind::Ally,
        })
        .await
        .unwrap();

        assert_eq!(repo.get_all(None).await.unwrap().len(), 2);
        let enemies = repo.get_all(Some(NpcKind::Enemy)).await.unwrap();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].name, "Goblin");
        assert_eq!(enemies[0].initiative, Some(14));
    }

    #[tokio::test]
    async fn test_update_switches_side() {
        let repo = SqliteNpcRepository::new(memory_pool().await).await.unwrap();
        let npc = repo.create(&goblin()).await.unwrap();

        let patch = NpcPatch {
            fields: RosterPatch {
                name: Some("Reformed Goblin".into()),
                ..Default::default()
            },
            kind: Some(NpcKind::Ally),
        };
        let updated = repo.update(npc.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Reformed Goblin");
        assert_eq!(updated.kind, NpcKind::Ally);
        assert_eq!(updated.max_hp, 7);

        assert!(repo.delete(npc.id).await.unwrap());
        assert!(repo.update(npc.id, &patch).await.unwrap().is_none());
    }
}
