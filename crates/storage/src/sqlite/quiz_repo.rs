use quiz_core::model::{Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{conn, map_quiz_row, ser};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let draft = quiz.to_draft();
        let tags = serde_json::to_string(&draft.tags).map_err(ser)?;
        let questions = serde_json::to_string(&draft.questions).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO quizzes (id, title, description, author, category, time_limit, difficulty, tags, questions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                author = excluded.author,
                category = excluded.category,
                time_limit = excluded.time_limit,
                difficulty = excluded.difficulty,
                tags = excluded.tags,
                questions = excluded.questions
            ",
        )
        .bind(quiz.id().as_str())
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.author)
        .bind(draft.category)
        .bind(i64::from(draft.time_limit))
        .bind(draft.difficulty.as_str())
        .bind(tags)
        .bind(questions)
        .bind(quiz.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, author, category, time_limit, difficulty, tags, questions, created_at
            FROM quizzes WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_quiz_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, author, category, time_limit, difficulty, tags, questions, created_at
            FROM quizzes
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }
}
