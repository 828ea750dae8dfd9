use async_trait::async_trait;
use quiz_core::model::{ProgressRecord, ProgressValue, Quiz, QuizId, ResultId, ResultRecord};
use quiz_core::share_code::ShareCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Catalog of quiz definitions.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by id; `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError>;

    /// All quizzes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;
}

/// Key-value store for in-flight attempts, keyed by `progress:<quizId>`.
///
/// Each write is a full snapshot; the last writer wins.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Overwrite the record stored for `record.quiz_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn put_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Raw lookup; freshness is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn get_progress(&self, quiz_id: &QuizId) -> Result<Option<ProgressRecord>, StorageError>;

    /// Remove the record if present. Deleting a missing record is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_progress(&self, quiz_id: &QuizId) -> Result<(), StorageError>;
}

/// Append-only leaderboard results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Append a result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result with the same id exists.
    async fn append_result(&self, result: &ResultRecord) -> Result<(), StorageError>;

    /// All results in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_results(&self) -> Result<Vec<ResultRecord>, StorageError>;
}

/// Mapping from share codes to quiz ids.
#[async_trait]
pub trait ShareCodeRepository: Send + Sync {
    /// Point `code` at `quiz_id`, replacing any previous mapping for the code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the mapping cannot be stored.
    async fn store_share_code(&self, code: &ShareCode, quiz_id: &QuizId)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn resolve_share_code(&self, code: &ShareCode) -> Result<Option<QuizId>, StorageError>;

    /// Most recently stored code for `quiz_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn share_code_for(&self, quiz_id: &QuizId) -> Result<Option<ShareCode>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    progress: Arc<Mutex<HashMap<String, ProgressValue>>>,
    results: Arc<Mutex<Vec<ResultRecord>>>,
    share_codes: Arc<Mutex<Vec<(ShareCode, QuizId)>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id().clone(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        let mut quizzes: Vec<Quiz> = guard.values().cloned().collect();
        quizzes.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(quizzes)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn put_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(record.storage_key(), record.to_value());
        Ok(())
    }

    async fn get_progress(&self, quiz_id: &QuizId) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard
            .get(&ProgressRecord::key_for(quiz_id))
            .cloned()
            .map(|value| ProgressRecord::from_value(quiz_id.clone(), value)))
    }

    async fn delete_progress(&self, quiz_id: &QuizId) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.remove(&ProgressRecord::key_for(quiz_id));
        Ok(())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &ResultRecord) -> Result<(), StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let id: ResultId = result.id();
        if guard.iter().any(|r| r.id() == id) {
            return Err(StorageError::Conflict);
        }
        guard.push(result.clone());
        Ok(())
    }

    async fn list_results(&self) -> Result<Vec<ResultRecord>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ShareCodeRepository for InMemoryRepository {
    async fn store_share_code(
        &self,
        code: &ShareCode,
        quiz_id: &QuizId,
    ) -> Result<(), StorageError> {
        let mut guard = self.share_codes.lock().map_err(poisoned)?;
        guard.retain(|(existing, _)| existing != code);
        guard.push((code.clone(), quiz_id.clone()));
        Ok(())
    }

    async fn resolve_share_code(&self, code: &ShareCode) -> Result<Option<QuizId>, StorageError> {
        let guard = self.share_codes.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, id)| id.clone()))
    }

    async fn share_code_for(&self, quiz_id: &QuizId) -> Result<Option<ShareCode>, StorageError> {
        let guard = self.share_codes.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .rev()
            .find(|(_, id)| id == quiz_id)
            .map(|(code, _)| code.clone()))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub share_codes: Arc<dyn ShareCodeRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            quizzes: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            share_codes: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{AnswerSheet, QuestionDraft, QuizDraft};
    use quiz_core::time::fixed_now;

    fn build_quiz(id: &str, offset_mins: i64) -> Quiz {
        QuizDraft {
            title: format!("Quiz {id}"),
            time_limit: 5,
            questions: vec![QuestionDraft::new(
                1,
                "Q",
                vec!["a".into(), "b".into()],
                1,
            )],
            ..QuizDraft::default()
        }
        .validate(QuizId::new(id), fixed_now() + Duration::minutes(offset_mins))
        .unwrap()
    }

    #[tokio::test]
    async fn lists_quizzes_oldest_first() {
        let repo = InMemoryRepository::new();
        repo.upsert_quiz(&build_quiz("b", 5)).await.unwrap();
        repo.upsert_quiz(&build_quiz("a", 10)).await.unwrap();
        repo.upsert_quiz(&build_quiz("c", 0)).await.unwrap();

        let ids: Vec<_> = repo
            .list_quizzes()
            .await
            .unwrap()
            .iter()
            .map(|q| q.id().to_string())
            .collect();
        assert_eq!(ids, ["c", "b", "a"]);
        assert!(repo.get_quiz(&QuizId::new("zz")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn progress_is_keyed_per_quiz_and_overwritten() {
        let repo = InMemoryRepository::new();
        let quiz_id = QuizId::new("1");
        let mut answers = AnswerSheet::new(2);
        repo.put_progress(&ProgressRecord::new(quiz_id.clone(), answers.clone(), 0, fixed_now()))
            .await
            .unwrap();
        answers.set(1, 0);
        repo.put_progress(&ProgressRecord::new(quiz_id.clone(), answers.clone(), 1, fixed_now()))
            .await
            .unwrap();

        let stored = repo.get_progress(&quiz_id).await.unwrap().unwrap();
        assert_eq!(stored.answers, answers);
        assert_eq!(stored.current_question_index, 1);
        assert!(repo.get_progress(&QuizId::new("2")).await.unwrap().is_none());

        repo.delete_progress(&quiz_id).await.unwrap();
        repo.delete_progress(&quiz_id).await.unwrap();
        assert!(repo.get_progress(&quiz_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn results_are_append_only() {
        let repo = InMemoryRepository::new();
        let first = ResultRecord::new(QuizId::new("1"), "Ana", 90, 100, fixed_now()).unwrap();
        let second = ResultRecord::new(QuizId::new("1"), "Ben", 70, 120, fixed_now()).unwrap();
        repo.append_result(&first).await.unwrap();
        repo.append_result(&second).await.unwrap();

        let err = repo.append_result(&first).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let all = repo.list_results().await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn share_codes_resolve_latest_mapping() {
        let repo = InMemoryRepository::new();
        let code = ShareCode::parse("ABC123").unwrap();
        repo.store_share_code(&code, &QuizId::new("1")).await.unwrap();
        repo.store_share_code(&code, &QuizId::new("2")).await.unwrap();

        assert_eq!(
            repo.resolve_share_code(&code).await.unwrap(),
            Some(QuizId::new("2"))
        );
        assert_eq!(repo.share_code_for(&QuizId::new("1")).await.unwrap(), None);
        assert_eq!(
            repo.share_code_for(&QuizId::new("2")).await.unwrap(),
            Some(code)
        );
    }
}
