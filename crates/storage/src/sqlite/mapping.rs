use quiz_core::model::{
    Difficulty, QuestionDraft, Quiz, QuizDraft, QuizId, ResultId, ResultRecord,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<Quiz, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let difficulty: Difficulty = difficulty.parse().map_err(ser)?;
    let tags: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("tags").map_err(ser)?).map_err(ser)?;
    let questions: Vec<QuestionDraft> =
        serde_json::from_str(&row.try_get::<String, _>("questions").map_err(ser)?)
            .map_err(ser)?;

    let draft = QuizDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        author: row.try_get("author").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        time_limit: i64_to_u32("time_limit", row.try_get("time_limit").map_err(ser)?)?,
        difficulty,
        tags,
        questions,
    };

    Quiz::from_persisted(
        QuizId::new(id),
        draft,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ResultRecord, StorageError> {
    let id: ResultId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let time_taken: i64 = row.try_get("time_taken").map_err(ser)?;
    let time_taken = u64::try_from(time_taken)
        .map_err(|_| StorageError::Serialization(format!("invalid time_taken: {time_taken}")))?;

    ResultRecord::from_persisted(
        id,
        QuizId::new(row.try_get::<String, _>("quiz_id").map_err(ser)?),
        &row.try_get::<String, _>("username").map_err(ser)?,
        i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        time_taken,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}
