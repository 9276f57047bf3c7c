//! SQLite store for saved characters

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::application::ports::outbound::{CharacterRecordPort, RecordStoreError};
use crate::domain::entities::{Character, RosterPatch, StoredCharacter};
use crate::domain::value_objects::CharacterId;

type CharacterRow = (String, String, i64, i64, Option<i64>, DateTime<Utc>, DateTime<Utc>);

const SELECT_COLUMNS: &str =
    "SELECT id, name, max_hp, ac, initiative, created_at, updated_at FROM characters";

pub struct SqliteCharacterRepository {
    pool: SqlitePool,
}

impl SqliteCharacterRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                max_hp INTEGER NOT NULL,
                ac INTEGER NOT NULL,
                initiative INTEGER,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn find(&self, id: CharacterId) -> Result<Option<StoredCharacter>, RecordStoreError> {
        let row: Option<CharacterRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        row.map(from_row).transpose()
    }
}

fn from_row(
    (id, name, max_hp, ac, initiative, created_at, updated_at): CharacterRow,
) -> Result<StoredCharacter, RecordStoreError> {
    Ok(StoredCharacter {
        id: id
            .parse()
            .map_err(|e| RecordStoreError::Serialization(format!("bad character id: {}", e)))?,
        character: Character {
            name,
            max_hp: max_hp as u32,
            ac: ac as i32,
            initiative: initiative.map(|i| i as i32),
        },
        created_at: Some(created_at),
        updated_at: Some(updated_at),
    })
}

#[async_trait]
impl CharacterRecordPort for SqliteCharacterRepository {
    async fn get_all(&self) -> Result<Vec<StoredCharacter>, RecordStoreError> {
        let rows: Vec<CharacterRow> =
            sqlx::query_as(&format!("{} ORDER BY created_at, name", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RecordStoreError::Database(e.to_string()))?;
        rows.into_iter().map(from_row).collect()
    }

    async fn create(&self, character: &Character) -> Result<StoredCharacter, RecordStoreError> {
        let id = CharacterId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO characters (id, name, max_hp, ac, initiative, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&character.name)
        .bind(character.max_hp as i64)
        .bind(character.ac as i64)
        .bind(character.initiative.map(i64::from))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RecordStoreError::Database(e.to_string()))?;

        Ok(StoredCharacter {
            id,
            character: character.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    async fn update(
        &self,
        id: CharacterId,
        patch: &RosterPatch,
    ) -> Result<Option<StoredCharacter>, RecordStoreError> {
        let result = sqlx::query(
            "UPDATE characters SET \
                name = COALESCE(?, name), \
                max_hp = COALESCE(?, max_hp), \
                ac = COALESCE(?, ac), \
                initiative = COALESCE(?, initiative), \
                updated_at = ? \
             WHERE id = ?",
        )
        .bind(patch.name.as_deref())
        .bind(patch.max_hp.map(i64::from))
        .bind(patch.ac.map(i64::from))
        .bind(patch.initiative.map(i64::from))
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

    async fn delete(&self, id: CharacterId) -> Result<bool, RecordStoreError> {
        let result = sqlx::query("DELETE FROM characters WHERE id = ?")
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
    use crate::infrastructure::persistence::memory_pool;

    async fn repository() -> SqliteCharacterRepository {
        SqliteCharacterRepository::new(memory_pool().await).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let repo = repository().await;
        let stored = repo
            .create(&Character::new("Aria", 24, 16).with_initiative(12))
            .await
            .unwrap();
        assert!(stored.created_at.is_some());

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, stored.id);
        assert_eq!(all[0].character, Character::new("Aria", 24, 16).with_initiative(12));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let repo = repository().await;
        let stored = repo.create(&Character::new("Aria", 24, 16)).await.unwrap();

        let patch = RosterPatch {
            max_hp: Some(30),
            ..Default::default()
        };
        let updated = repo.update(stored.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.character.name, "Aria");
        assert_eq!(updated.character.max_hp, 30);
        assert_eq!(updated.character.ac, 16);

        assert!(repo
            .update(CharacterId::new(), &patch)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repository().await;
        let stored = repo.create(&Character::new("Aria", 24, 16)).await.unwrap();
        assert!(repo.delete(stored.id).await.unwrap());
        assert!(!repo.delete(stored.id).await.unwrap());
        assert!(repo.get_all().await.unwrap().is_empty());
    }
}
