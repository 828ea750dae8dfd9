use chrono::Utc;
use quiz_core::model::QuizId;
use quiz_core::share_code::ShareCode;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ShareCodeRepository, StorageError};

#[async_trait::async_trait]
impl ShareCodeRepository for SqliteRepository {
    async fn store_share_code(
        &self,
        code: &ShareCode,
        quiz_id: &QuizId,
    ) -> Result<(), StorageError> {
        // REPLACE deletes the old row, so the new mapping gets a fresh rowid.
        sqlx::query(
            r"
            INSERT OR REPLACE INTO share_codes (code, quiz_id, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(code.as_str())
        .bind(quiz_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn resolve_share_code(&self, code: &ShareCode) -> Result<Option<QuizId>, StorageError> {
        let row = sqlx::query("SELECT quiz_id FROM share_codes WHERE code = ?1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| row.try_get::<String, _>("quiz_id").map(QuizId::new))
            .transpose()
            .map_err(ser)
    }

    async fn share_code_for(&self, quiz_id: &QuizId) -> Result<Option<ShareCode>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT code FROM share_codes
            WHERE quiz_id = ?1
            ORDER BY rowid DESC
            LIMIT 1
            ",
        )
        .bind(quiz_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("code").map_err(ser)?;
        ShareCode::parse(&raw).map(Some).map_err(ser)
    }
}
