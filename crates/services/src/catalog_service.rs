use std::collections::BTreeSet;
use std::sync::Arc;

use rand::Rng;

use quiz_core::model::{Difficulty, Quiz, QuizDraft, QuizId};
use quiz_core::share_code::ShareCode;
use storage::repository::{QuizRepository, ShareCodeRepository};

use crate::Clock;
use crate::error::CatalogError;

/// Seeds tried after the derived code turns out to be taken.
const SHARE_CODE_ATTEMPTS: usize = 8;

/// Quiz authoring and lookup, including share codes.
#[derive(Clone)]
pub struct QuizCatalogService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    share_codes: Arc<dyn ShareCodeRepository>,
}

/// A stored quiz and the code that opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedQuiz {
    pub quiz: Quiz,
    pub share_code: ShareCode,
}

/// Browsing filters for [`QuizCatalogService::search`]. Unset fields match
/// every quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizFilter {
    /// Case-insensitive substring of the title, description or category.
    pub search: Option<String>,
    /// Whole category name, ignoring case.
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl QuizFilter {
    #[must_use]
    pub fn matches(&self, quiz: &Quiz) -> bool {
        let needle = non_blank(self.search.as_deref()).map(str::to_lowercase);
        let text_hit = needle.as_deref().is_none_or(|n| {
            [quiz.title(), quiz.description(), quiz.category()]
                .iter()
                .any(|field| field.to_lowercase().contains(n))
        });
        let category_hit = non_blank(self.category.as_deref())
            .is_none_or(|c| quiz.category().eq_ignore_ascii_case(c));
        let difficulty_hit = self.difficulty.is_none_or(|d| quiz.difficulty() == d);
        text_hit && category_hit && difficulty_hit
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl QuizCatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        share_codes: Arc<dyn ShareCodeRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            share_codes,
        }
    }

    /// Validate `draft`, assign a fresh id and store it with a share code.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Quiz` for invalid drafts,
    /// `CatalogError::ShareCodeExhausted` if no free code was found, or a
    /// store error.
    pub async fn create_quiz(&self, draft: QuizDraft) -> Result<PublishedQuiz, CatalogError> {
        let now = self.clock.now();
        let quiz = draft.validate(QuizId::generate(), now)?;
        self.quizzes.upsert_quiz(&quiz).await?;

        let fallback = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let share_code = self.assign_share_code(quiz.id(), fallback).await?;
        tracing::info!(quiz_id = %quiz.id(), %share_code, "quiz created");
        Ok(PublishedQuiz { quiz, share_code })
    }

    /// Return the quiz's share code, creating one if it has none yet.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` with `NotFound` for unknown quizzes.
    pub async fn share_code_for(&self, quiz_id: &QuizId) -> Result<ShareCode, CatalogError> {
        if let Some(code) = self.share_codes.share_code_for(quiz_id).await? {
            return Ok(code);
        }
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(storage::repository::StorageError::NotFound)?;
        let fallback = u64::try_from(quiz.created_at().timestamp_millis()).unwrap_or_default();
        self.assign_share_code(quiz.id(), fallback).await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn get_quiz(&self, quiz_id: &QuizId) -> Result<Option<Quiz>, CatalogError> {
        Ok(self.quizzes.get_quiz(quiz_id).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>, CatalogError> {
        Ok(self.quizzes.list_quizzes().await?)
    }

    /// Quizzes passing `filter`, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn search(&self, filter: &QuizFilter) -> Result<Vec<Quiz>, CatalogError> {
        let mut quizzes = self.list_quizzes().await?;
        quizzes.retain(|quiz| filter.matches(quiz));
        Ok(quizzes)
    }

    /// Distinct non-empty categories, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store fails.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let categories: BTreeSet<String> = self
            .list_quizzes()
            .await?
            .iter()
            .map(|quiz| quiz.category().to_owned())
            .filter(|category| !category.is_empty())
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Resolve user input such as `" bs9q7o "` to a quiz.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ShareCode` for malformed input or a store error.
    pub async fn find_by_share_code(&self, raw: &str) -> Result<Option<Quiz>, CatalogError> {
        let code = ShareCode::parse(raw)?;
        let Some(quiz_id) = self.share_codes.resolve_share_code(&code).await? else {
            return Ok(None);
        };
        Ok(self.quizzes.get_quiz(&quiz_id).await?)
    }

    async fn assign_share_code(
        &self,
        quiz_id: &QuizId,
        fallback_seed: u64,
    ) -> Result<ShareCode, CatalogError> {
        let mut seed = fallback_seed;
        for _ in 0..=SHARE_CODE_ATTEMPTS {
            let code = ShareCode::derive(quiz_id, seed);
            match self.share_codes.resolve_share_code(&code).await? {
                Some(owner) if owner != *quiz_id => {
                    tracing::debug!(%quiz_id, %code, %owner, "share code taken, reseeding");
                }
                _ => {
                    self.share_codes.store_share_code(&code, quiz_id).await?;
                    return Ok(code);
                }
            }
            seed = rand::rng().random();
        }
        Err(CatalogError::ShareCodeExhausted(quiz_id.clone()))
    }
}
