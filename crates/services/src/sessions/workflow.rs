use std::sync::Arc;

use quiz_core::model::{QuizId, ResultRecord};
use storage::repository::{ProgressRepository, QuizRepository, ResultRepository};

use super::service::{
    QuizSession, SessionMode, SubmissionReport, SubmitTrigger, TickOutcome, ViolationChoice,
    ViolationResolution,
};
use crate::Clock;
use crate::error::SessionError;
use crate::identity::IdentityProvider;
use crate::progress_service::ProgressService;

/// Freshly opened attempt.
#[derive(Debug, Clone)]
pub struct OpenedAttempt {
    pub session: QuizSession,
    /// Answers were seeded from saved progress.
    pub restored: bool,
}

/// Result of closing an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub report: SubmissionReport,
    /// Present when an exam result was saved under the signed-in identity.
    pub saved_result: Option<ResultRecord>,
}

/// Orchestrates a `QuizSession` against the quiz, progress and result stores.
#[derive(Clone)]
pub struct QuizAttemptService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    progress: ProgressService,
    results: Arc<dyn ResultRepository>,
    identity: Arc<dyn IdentityProvider>,
}

impl QuizAttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
        results: Arc<dyn ResultRepository>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            progress: ProgressService::new(clock, progress),
            results,
            identity,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Load the quiz and any fresh saved progress, then open a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuizNotFound` if the id does not resolve and
    /// `SessionError::Storage` on store failures.
    pub async fn open_attempt(
        &self,
        quiz_id: &QuizId,
        mode: SessionMode,
    ) -> Result<OpenedAttempt, SessionError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| SessionError::QuizNotFound(quiz_id.clone()))?;
        let saved = self.progress.load(quiz_id).await?;
        let session = QuizSession::open(quiz, mode, saved, self.clock.now());
        let restored = session.restored();

        tracing::info!(%quiz_id, ?mode, restored, "attempt opened");
        Ok(OpenedAttempt { session, restored })
    }

    /// Select an option on the current question and save progress.
    ///
    /// # Errors
    ///
    /// Propagates `QuizSession::select_option` errors and store failures.
    pub async fn select_option(
        &self,
        session: &mut QuizSession,
        option: usize,
    ) -> Result<bool, SessionError> {
        let changed = session.select_option(option)?;
        if changed {
            self.save_progress(session).await?;
        }
        Ok(changed)
    }

    /// # Errors
    ///
    /// Propagates navigation errors and store failures.
    pub async fn go_to_next(&self, session: &mut QuizSession) -> Result<bool, SessionError> {
        let moved = session.go_to_next()?;
        self.save_progress(session).await?;
        Ok(moved)
    }

    /// # Errors
    ///
    /// Propagates navigation errors and store failures.
    pub async fn go_to_previous(&self, session: &mut QuizSession) -> Result<bool, SessionError> {
        let moved = session.go_to_previous()?;
        self.save_progress(session).await?;
        Ok(moved)
    }

    /// # Errors
    ///
    /// Propagates navigation errors and store failures.
    pub async fn jump_to(
        &self,
        session: &mut QuizSession,
        index: usize,
    ) -> Result<bool, SessionError> {
        let moved = session.jump_to(index)?;
        self.save_progress(session).await?;
        Ok(moved)
    }

    /// # Errors
    ///
    /// Propagates `QuizSession::start_exam` errors.
    pub fn start_exam(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.start_exam(self.clock.now())
    }

    /// # Errors
    ///
    /// Propagates `QuizSession::cancel_start` errors.
    pub fn cancel_start(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.cancel_start()?;
        tracing::info!(quiz_id = %session.quiz_id(), "exam cancelled at start gate");
        Ok(())
    }

    /// One countdown second. Finalizes the attempt when time runs out.
    ///
    /// Ticks never write progress.
    pub async fn tick(&self, session: &mut QuizSession) -> Option<SubmitOutcome> {
        match session.tick(self.clock.now()) {
            TickOutcome::Expired(report) => Some(self.finalize(session, report).await),
            TickOutcome::Ignored | TickOutcome::Counting(_) => None,
        }
    }

    /// Submit the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnansweredQuestions` for a plain learner submit
    /// with blanks, or a phase error.
    pub async fn submit(
        &self,
        session: &mut QuizSession,
        trigger: SubmitTrigger,
    ) -> Result<SubmitOutcome, SessionError> {
        let report = session.submit(trigger, self.clock.now())?;
        Ok(self.finalize(session, report).await)
    }

    /// Act on the learner's answer to a fullscreen violation.
    ///
    /// Returns the outcome when the learner ended the exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoViolationPending` if nothing is pending.
    pub async fn resolve_violation(
        &self,
        session: &mut QuizSession,
        choice: ViolationChoice,
    ) -> Result<Option<SubmitOutcome>, SessionError> {
        match session.resolve_violation(choice, self.clock.now())? {
            ViolationResolution::Ended(report) => Ok(Some(self.finalize(session, report).await)),
            ViolationResolution::Resumed => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Propagates `QuizSession::review_answers` errors.
    pub fn review_answers(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.review_answers()
    }

    /// Append a leaderboard entry under `participant`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ParticipantNameRequired` for a blank name,
    /// `SessionError::ResultAlreadySaved` on a second save, or a store error.
    pub async fn save_result(
        &self,
        session: &mut QuizSession,
        participant: &str,
    ) -> Result<ResultRecord, SessionError> {
        let record = session.prepare_result(participant, self.clock.now())?;
        self.results.append_result(&record).await?;
        session.mark_result_saved(record.id());
        tracing::info!(
            quiz_id = %record.quiz_id(),
            participant = record.username(),
            score = record.score(),
            "result saved"
        );
        Ok(record)
    }

    async fn save_progress(&self, session: &QuizSession) -> Result<(), SessionError> {
        if let Some(record) = session.progress_record(self.clock.now()) {
            self.progress
                .save(&record.quiz_id, &record.answers, record.current_question_index)
                .await?;
        }
        Ok(())
    }

    /// Post-submission effects, in order: progress is cleared (the score has
    /// already been read), then an exam result is saved for a signed-in learner.
    ///
    /// The attempt is already closed, so store failures are logged rather
    /// than returned.
    async fn finalize(&self, session: &mut QuizSession, report: SubmissionReport) -> SubmitOutcome {
        if let Err(err) = self.progress.clear(&report.quiz_id).await {
            tracing::warn!(quiz_id = %report.quiz_id, error = %err, "failed to clear progress");
        }

        let mut saved_result = None;
        if report.mode.is_exam() {
            if let Some(identity) = self.identity.current_user().await {
                match self.save_result(session, &identity.name).await {
                    Ok(record) => saved_result = Some(record),
                    Err(err) => {
                        tracing::warn!(quiz_id = %report.quiz_id, error = %err, "automatic result save failed");
                    }
                }
            }
        }

        SubmitOutcome {
            report,
            saved_result,
        }
    }
}
