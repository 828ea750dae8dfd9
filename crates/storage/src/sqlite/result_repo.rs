use quiz_core::model::ResultRecord;

use super::SqliteRepository;
use super::mapping::{conn, map_result_row, u64_to_i64};
use crate::repository::{ResultRepository, StorageError};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, result: &ResultRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO results (id, quiz_id, username, score, time_taken, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(result.id().to_string())
        .bind(result.quiz_id().as_str())
        .bind(result.username())
        .bind(i64::from(result.score()))
        .bind(u64_to_i64("time_taken", result.time_taken_secs())?)
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        Ok(())
    }

    async fn list_results(&self) -> Result<Vec<ResultRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, quiz_id, username, score, time_taken, completed_at
            FROM results
            ORDER BY rowid ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }
}
