use quiz_core::model::{ProgressRecord, ProgressValue, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn put_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let value = serde_json::to_string(&record.to_value()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO progress (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(record.storage_key())
        .bind(value)
        .bind(record.saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_progress(&self, quiz_id: &QuizId) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query("SELECT value FROM progress WHERE key = ?1")
            .bind(ProgressRecord::key_for(quiz_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("value").map_err(ser)?;
        let value: ProgressValue = serde_json::from_str(&raw).map_err(ser)?;
        Ok(Some(ProgressRecord::from_value(quiz_id.clone(), value)))
    }

    async fn delete_progress(&self, quiz_id: &QuizId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM progress WHERE key = ?1")
            .bind(ProgressRecord::key_for(quiz_id))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
