use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Validation failures for quiz definitions.
///
/// Question positions are 1-based so they can be shown to authors as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title is required")]
    EmptyTitle,

    #[error("quiz must have at least one question")]
    NoQuestions,

    #[error("question {position} has no text")]
    EmptyQuestionText { position: usize },

    #[error("question {position} must have at least 2 options")]
    TooFewOptions { position: usize },

    #[error("question {position} has no valid correct answer (index {correct_answer})")]
    CorrectAnswerOutOfRange {
        position: usize,
        correct_answer: usize,
    },

    #[error("duplicate question id {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(QuizError::InvalidDifficulty(s.to_owned())),
        }
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Unvalidated question as authored or as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        id: u32,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
    ) -> Self {
        Self {
            id: QuestionId::new(id),
            question: question.into(),
            options,
            correct_answer,
        }
    }

    /// Validate the draft. `position` is the 1-based position within the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the prompt is blank, there are fewer than two
    /// options, or `correct_answer` does not index an option.
    pub fn validate(self, position: usize) -> Result<Question, QuizError> {
        let question = self.question.trim().to_owned();
        if question.is_empty() {
            return Err(QuizError::EmptyQuestionText { position });
        }
        if self.options.len() < 2 {
            return Err(QuizError::TooFewOptions { position });
        }
        if self.correct_answer >= self.options.len() {
            return Err(QuizError::CorrectAnswerOutOfRange {
                position,
                correct_answer: self.correct_answer,
            });
        }

        Ok(Question {
            id: self.id,
            question,
            options: self.options,
            correct_answer: self.correct_answer,
        })
    }
}

/// A validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn has_option(&self, option: usize) -> bool {
        option < self.options.len()
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }

    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id,
            question: self.question.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer,
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Quiz as submitted by an author, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub title: String,
    pub description: String,
    pub author: String,
    pub category: String,
    /// Minutes; `0` means untimed.
    pub time_limit: u32,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    /// Validate and freeze the draft into an immutable `Quiz`.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizError` found, checking the title before the
    /// questions in order.
    pub fn validate(self, id: QuizId, created_at: DateTime<Utc>) -> Result<Quiz, QuizError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        let mut questions = Vec::with_capacity(self.questions.len());
        for (index, draft) in self.questions.into_iter().enumerate() {
            if !seen.insert(draft.id) {
                return Err(QuizError::DuplicateQuestionId(draft.id));
            }
            questions.push(draft.validate(index + 1)?);
        }

        let tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Quiz {
            id,
            title,
            description: self.description.trim().to_owned(),
            author: self.author.trim().to_owned(),
            category: self.category.trim().to_owned(),
            time_limit_minutes: self.time_limit,
            difficulty: self.difficulty,
            tags,
            created_at,
            questions,
        })
    }
}

/// Immutable quiz definition that sessions are run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: String,
    author: String,
    category: String,
    time_limit_minutes: u32,
    difficulty: Difficulty,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    questions: Vec<Question>,
}

impl Quiz {
    /// Rehydrate a quiz from persisted storage, re-running validation.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the stored definition is no longer valid.
    pub fn from_persisted(
        id: QuizId,
        draft: QuizDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        draft.validate(id, created_at)
    }

    #[must_use]
    pub fn to_draft(&self) -> QuizDraft {
        QuizDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            time_limit: self.time_limit_minutes,
            difficulty: self.difficulty,
            tags: self.tags.clone(),
            questions: self.questions.iter().map(Question::to_draft).collect(),
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Countdown length in seconds, or `None` for untimed quizzes.
    #[must_use]
    pub fn time_limit_seconds(&self) -> Option<u32> {
        (self.time_limit_minutes > 0).then(|| self.time_limit_minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_limit_minutes > 0
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Always at least 1 for a validated quiz.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
