//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizError, QuizId, ResultError};
use quiz_core::share_code::ShareCodeError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionPhase;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error("the exam has not been started")]
    NotStarted,
    #[error("the exam has already been started")]
    AlreadyStarted,
    #[error("the attempt was cancelled")]
    Cancelled,
    #[error("the attempt has already been submitted")]
    AlreadySubmitted,
    #[error("the attempt has not been submitted yet")]
    NotSubmitted,
    #[error("{count} question(s) are still unanswered")]
    UnansweredQuestions { count: usize },
    #[error("option {option} does not exist for this question")]
    InvalidOption { option: usize },
    #[error("question {index} does not exist")]
    InvalidQuestionIndex { index: usize },
    #[error("only exam attempts have a start gate")]
    NotExamMode,
    #[error("answer review is only available for practice attempts")]
    ReviewUnavailable,
    #[error("no fullscreen violation is pending")]
    NoViolationPending,
    #[error("return to fullscreen or end the exam first")]
    ViolationPending,
    #[error("please enter your name")]
    ParticipantNameRequired,
    #[error("the result for this attempt has already been saved")]
    ResultAlreadySaved,
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("the session driver has stopped")]
    DriverClosed,
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors reported by a fullscreen proctor. Never fatal to the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProctorError {
    #[error("fullscreen request denied: {0}")]
    Denied(String),
    #[error("fullscreen is not supported here")]
    Unsupported,
}

/// Errors emitted by `QuizCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    ShareCode(#[from] ShareCodeError),
    #[error("could not find a free share code for quiz {0}")]
    ShareCodeExhausted(QuizId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LeaderboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
    #[error("unknown sort key: {0}")]
    UnknownSortKey(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
