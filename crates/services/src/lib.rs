#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod identity;
pub mod leaderboard_service;
pub mod proctor;
pub mod progress_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{PublishedQuiz, QuizCatalogService, QuizFilter};
pub use error::{
    AppServicesError, CatalogError, LeaderboardError, ProctorError, SessionError,
};
pub use identity::{Identity, IdentityProvider, StaticIdentity};
pub use leaderboard_service::{
    LeaderboardEntry, LeaderboardQuery, LeaderboardService, LeaderboardSort, SortDirection,
};
pub use proctor::{FullscreenProctor, HeadlessProctor};
pub use progress_service::ProgressService;
pub use sessions::{
    OpenedAttempt, QuizAttemptService, QuizSession, SessionCommand, SessionDriver, SessionHandle,
    SessionMode, SessionNotice, SessionPhase, SessionSnapshot, SubmissionReport, SubmitOutcome,
    SubmitTrigger, ViolationChoice,
};
