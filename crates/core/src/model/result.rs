use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{QuizId, ResultId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("participant name cannot be empty")]
    EmptyParticipant,

    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u32),
}

/// A completed attempt as shown on the leaderboard.
///
/// Append-only: once written a result is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    id: ResultId,
    quiz_id: QuizId,
    username: String,
    score: u8,
    #[serde(rename = "timeTaken")]
    time_taken_secs: u64,
    completed_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Create a new result with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::EmptyParticipant` if `username` is blank and
    /// `ResultError::ScoreOutOfRange` if `score > 100`.
    pub fn new(
        quiz_id: QuizId,
        username: &str,
        score: u32,
        time_taken_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        Self::from_persisted(
            ResultId::generate(),
            quiz_id,
            username,
            score,
            time_taken_secs,
            completed_at,
        )
    }

    /// Rehydrate a stored result.
    ///
    /// # Errors
    ///
    /// Same validation as [`ResultRecord::new`].
    pub fn from_persisted(
        id: ResultId,
        quiz_id: QuizId,
        username: &str,
        score: u32,
        time_taken_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ResultError::EmptyParticipant);
        }
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or(ResultError::ScoreOutOfRange(score))?;

        Ok(Self {
            id,
            quiz_id,
            username: username.to_owned(),
            score,
            time_taken_secs,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ResultId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Percentage score, 0..=100.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u64 {
        self.time_taken_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
