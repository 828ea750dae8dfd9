use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::answers::AnswerSheet;
use crate::model::ids::QuizId;
use crate::model::quiz::Quiz;

/// Saved progress older than this is discarded instead of restored.
pub const PROGRESS_FRESHNESS_HOURS: i64 = 24;

const KEY_PREFIX: &str = "progress:";

/// Persisted snapshot of an in-flight attempt.
///
/// Written by the active session after every answer and navigation, read once
/// when the next session for the same quiz opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub quiz_id: QuizId,
    pub answers: AnswerSheet,
    pub current_question_index: usize,
    pub saved_at: DateTime<Utc>,
}

/// Stored value shape; the quiz id lives in the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressValue {
    pub answers: AnswerSheet,
    pub current_question_index: usize,
    pub saved_at: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new(
        quiz_id: QuizId,
        answers: AnswerSheet,
        current_question_index: usize,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            quiz_id,
            answers,
            current_question_index,
            saved_at,
        }
    }

    /// Key under which progress for `quiz_id` is stored.
    #[must_use]
    pub fn key_for(quiz_id: &QuizId) -> String {
        format!("{KEY_PREFIX}{quiz_id}")
    }

    /// Inverse of [`ProgressRecord::key_for`].
    #[must_use]
    pub fn quiz_id_from_key(key: &str) -> Option<QuizId> {
        key.strip_prefix(KEY_PREFIX)
            .filter(|id| !id.is_empty())
            .map(QuizId::new)
    }

    #[must_use]
    pub fn storage_key(&self) -> String {
        Self::key_for(&self.quiz_id)
    }

    /// True once the record is strictly older than the freshness window.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.saved_at) > Duration::hours(PROGRESS_FRESHNESS_HOURS)
    }

    /// Whether this record can seed a session for `quiz` without breaking
    /// answer-sheet invariants.
    #[must_use]
    pub fn fits(&self, quiz: &Quiz) -> bool {
        if self.quiz_id != *quiz.id() || self.answers.len() != quiz.question_count() {
            return false;
        }
        if self.current_question_index >= quiz.question_count() {
            return false;
        }
        quiz.questions()
            .iter()
            .zip(self.answers.iter())
            .all(|(question, answer)| answer.is_none_or(|option| question.has_option(option)))
    }

    #[must_use]
    pub fn to_value(&self) -> ProgressValue {
        ProgressValue {
            answers: self.answers.clone(),
            current_question_index: self.current_question_index,
            saved_at: self.saved_at,
        }
    }

    #[must_use]
    pub fn from_value(quiz_id: QuizId, value: ProgressValue) -> Self {
        Self {
            quiz_id,
            answers: value.answers,
            current_question_index: value.current_question_index,
            saved_at: value.saved_at,
        }
    }
}
