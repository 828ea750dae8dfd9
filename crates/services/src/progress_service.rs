use std::sync::Arc;

use quiz_core::model::{AnswerSheet, ProgressRecord, QuizId};
use storage::repository::{ProgressRepository, StorageError};

use crate::Clock;

/// Saves and resumes in-flight attempts with a 24 hour freshness window.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Overwrite the record for `quiz_id` with a freshly timestamped snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn save(
        &self,
        quiz_id: &QuizId,
        answers: &AnswerSheet,
        current_question_index: usize,
    ) -> Result<ProgressRecord, StorageError> {
        let record = ProgressRecord::new(
            quiz_id.clone(),
            answers.clone(),
            current_question_index,
            self.clock.now(),
        );
        self.progress.put_progress(&record).await?;
        Ok(record)
    }

    /// Fetch the record for `quiz_id` if it is still fresh.
    ///
    /// Expired and unreadable records are deleted on the way out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read or the cleanup fails.
    pub async fn load(&self, quiz_id: &QuizId) -> Result<Option<ProgressRecord>, StorageError> {
        let record = match self.progress.get_progress(quiz_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(%quiz_id, %reason, "discarding unreadable progress");
                self.progress.delete_progress(quiz_id).await?;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if record.is_expired(self.clock.now()) {
            tracing::debug!(%quiz_id, saved_at = %record.saved_at, "discarding stale progress");
            self.progress.delete_progress(quiz_id).await?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Remove any record for `quiz_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    pub async fn clear(&self, quiz_id: &QuizId) -> Result<(), StorageError> {
        self.progress.delete_progress(quiz_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use quiz_core::time::fixed_now;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::InMemoryRepository;

    /// Store whose saved value no longer decodes.
    #[derive(Default)]
    struct CorruptProgress {
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl ProgressRepository for CorruptProgress {
        async fn put_progress(&self, _record: &ProgressRecord) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get_progress(
            &self,
            _quiz_id: &QuizId,
        ) -> Result<Option<ProgressRecord>, StorageError> {
            if self.deletes.load(Ordering::SeqCst) > 0 {
                return Ok(None);
            }
            Err(StorageError::Serialization("expected value at line 1".into()))
        }

        async fn delete_progress(&self, _quiz_id: &QuizId) -> Result<(), StorageError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ProgressService::new(Clock::fixed(fixed_now()), repo);
        let quiz_id = QuizId::new("1");
        let mut answers = AnswerSheet::new(3);
        answers.set(2, 1);

        service.save(&quiz_id, &answers, 2).await.unwrap();
        let loaded = service.load(&quiz_id).await.unwrap().unwrap();
        assert_eq!(loaded.answers, answers);
        assert_eq!(loaded.current_question_index, 2);
        assert_eq!(loaded.saved_at, fixed_now());
    }

    #[tokio::test]
    async fn stale_record_is_absent_and_deleted() {
        let repo = Arc::new(InMemoryRepository::new());
        let quiz_id = QuizId::new("1");
        let writer = ProgressService::new(Clock::fixed(fixed_now()), repo.clone());
        writer.save(&quiz_id, &AnswerSheet::new(2), 0).await.unwrap();

        let reader = ProgressService::new(
            Clock::fixed(fixed_now() + Duration::hours(25)),
            repo.clone(),
        );
        assert!(reader.load(&quiz_id).await.unwrap().is_none());
        assert!(repo.get_progress(&quiz_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exactly_twenty_four_hours_is_still_fresh() {
        let repo = Arc::new(InMemoryRepository::new());
        let quiz_id = QuizId::new("1");
        let writer = ProgressService::new(Clock::fixed(fixed_now()), repo.clone());
        writer.save(&quiz_id, &AnswerSheet::new(1), 0).await.unwrap();

        let reader = ProgressService::new(Clock::fixed(fixed_now() + Duration::hours(24)), repo);
        assert!(reader.load(&quiz_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unreadable_record_is_absent_and_deleted() {
        let repo = Arc::new(CorruptProgress::default());
        let service = ProgressService::new(Clock::fixed(fixed_now()), repo.clone());
        let quiz_id = QuizId::new("1");

        assert!(service.load(&quiz_id).await.unwrap().is_none());
        assert_eq!(repo.deletes.load(Ordering::SeqCst), 1);
        assert!(service.load(&quiz_id).await.unwrap().is_none());
        assert_eq!(repo.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_removes_record() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ProgressService::new(Clock::fixed(fixed_now()), repo);
        let quiz_id = QuizId::new("1");
        service.save(&quiz_id, &AnswerSheet::new(1), 0).await.unwrap();
        service.clear(&quiz_id).await.unwrap();
        assert!(service.load(&quiz_id).await.unwrap().is_none());
    }
}
