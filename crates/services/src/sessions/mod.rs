mod driver;
mod progress;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use driver::{SessionCommand, SessionDriver, SessionHandle, SessionNotice, SessionWarning};
pub use progress::SessionProgress;
pub use service::{
    FALLBACK_TIME_TAKEN_SECS, QuizSession, SessionMode, SessionPhase, SubmissionReport,
    SubmitTrigger, TickOutcome, TimeRemaining, ViolationChoice, ViolationResolution,
};
pub use timer::SessionTimer;
pub use view::SessionSnapshot;
pub use workflow::{OpenedAttempt, QuizAttemptService, SubmitOutcome};
