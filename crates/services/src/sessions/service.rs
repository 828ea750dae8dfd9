use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use quiz_core::model::{AnswerSheet, ProgressRecord, Question, Quiz, QuizId, ResultId, ResultRecord};
use quiz_core::scoring::{ScoreBreakdown, score_answers};
use quiz_core::time::whole_seconds_between;

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Time taken recorded when an attempt was never started and the quiz is untimed.
pub const FALLBACK_TIME_TAKEN_SECS: u64 = 600;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Practice,
    Exam,
}

impl SessionMode {
    #[must_use]
    pub fn is_exam(self) -> bool {
        matches!(self, SessionMode::Exam)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Exam attempt waiting behind the start gate.
    AwaitingStart,
    InProgress,
    Submitted,
    /// Practice attempt showing correctness after submission.
    Reviewing,
    /// Exam attempt abandoned at the start gate.
    Cancelled,
}

impl SessionPhase {
    #[must_use]
    pub fn is_submitted(self) -> bool {
        matches!(self, SessionPhase::Submitted | SessionPhase::Reviewing)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::AwaitingStart => "awaiting start",
            SessionPhase::InProgress => "in progress",
            SessionPhase::Submitted => "submitted",
            SessionPhase::Reviewing => "reviewing",
            SessionPhase::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "seconds")]
pub enum TimeRemaining {
    Untimed,
    Seconds(u32),
}

impl TimeRemaining {
    #[must_use]
    pub fn seconds(self) -> Option<u32> {
        match self {
            TimeRemaining::Untimed => None,
            TimeRemaining::Seconds(s) => Some(s),
        }
    }
}

/// Why a submission was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitTrigger {
    /// Rejected while questions remain unanswered.
    Learner,
    /// Second, explicit confirmation; forces through.
    LearnerConfirmed,
    Timeout,
    /// Learner chose to end the exam after leaving fullscreen.
    Violation,
}

impl SubmitTrigger {
    #[must_use]
    pub fn is_forced(self) -> bool {
        !matches!(self, SubmitTrigger::Learner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationChoice {
    EndExam,
    ReturnToFullscreen,
}

/// Read-only summary produced exactly once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub quiz_id: QuizId,
    pub mode: SessionMode,
    pub score: ScoreBreakdown,
    pub unanswered: usize,
    pub time_taken_secs: u64,
    pub trigger: SubmitTrigger,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, untimed, or already over.
    Ignored,
    Counting(u32),
    Expired(SubmissionReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationResolution {
    Ended(SubmissionReport),
    Resumed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's attempt at one quiz.
///
/// Pure state machine: every transition takes `now` from the caller and
/// performs no I/O. Persistence, timers and fullscreen requests are driven by
/// `QuizAttemptService` and `SessionDriver`.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    mode: SessionMode,
    phase: SessionPhase,
    current: usize,
    answers: AnswerSheet,
    time_remaining: TimeRemaining,
    score: Option<ScoreBreakdown>,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    time_taken_secs: Option<u64>,
    fullscreen_active: bool,
    fullscreen_denied: bool,
    violation_pending: bool,
    restored: bool,
    result_saved: Option<ResultId>,
}

impl QuizSession {
    /// Build a session for `quiz`.
    ///
    /// A fresh progress record that fits the quiz seeds the answers and the
    /// current question. Practice attempts start immediately; exam attempts
    /// wait in `AwaitingStart`.
    #[must_use]
    pub fn open(
        quiz: Quiz,
        mode: SessionMode,
        saved: Option<ProgressRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut answers = AnswerSheet::new(quiz.question_count());
        let mut current = 0;
        let mut restored = false;

        if let Some(record) = saved {
            if record.is_expired(now) {
                tracing::debug!(quiz_id = %quiz.id(), "ignoring expired progress");
            } else if !record.fits(&quiz) {
                tracing::warn!(quiz_id = %quiz.id(), "saved progress does not match quiz, starting fresh");
            } else {
                answers = record.answers;
                current = record.current_question_index;
                restored = true;
            }
        }

        let time_remaining = quiz
            .time_limit_seconds()
            .map_or(TimeRemaining::Untimed, TimeRemaining::Seconds);
        let (phase, started_at) = match mode {
            SessionMode::Practice => (SessionPhase::InProgress, Some(now)),
            SessionMode::Exam => (SessionPhase::AwaitingStart, None),
        };

        Self {
            quiz,
            mode,
            phase,
            current,
            answers,
            time_remaining,
            score: None,
            started_at,
            submitted_at: None,
            time_taken_secs: None,
            fullscreen_active: false,
            fullscreen_denied: false,
            violation_pending: false,
            restored,
            result_saved: None,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        self.quiz.id()
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.question(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn time_remaining(&self) -> TimeRemaining {
        self.time_remaining
    }

    #[must_use]
    pub fn score(&self) -> Option<ScoreBreakdown> {
        self.score
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase.is_submitted()
    }

    #[must_use]
    pub fn answers_revealed(&self) -> bool {
        self.phase == SessionPhase::Reviewing
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> Option<u64> {
        self.time_taken_secs
    }

    #[must_use]
    pub fn fullscreen_active(&self) -> bool {
        self.fullscreen_active
    }

    /// The host refused fullscreen at least once during this attempt.
    #[must_use]
    pub fn fullscreen_was_denied(&self) -> bool {
        self.fullscreen_denied
    }

    #[must_use]
    pub fn violation_pending(&self) -> bool {
        self.violation_pending
    }

    #[must_use]
    pub fn restored(&self) -> bool {
        self.restored
    }

    #[must_use]
    pub fn saved_result(&self) -> Option<ResultId> {
        self.result_saved
    }

    /// Whether a countdown should be running right now.
    #[must_use]
    pub fn needs_timer(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.time_remaining != TimeRemaining::Untimed
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.answers.len();
        let answered = self.answers.answered_count();
        SessionProgress {
            total,
            answered,
            unanswered: total - answered,
            current: self.current,
            is_complete: self.answers.is_complete(),
        }
    }

    /// Snapshot for the progress store. Only in-progress attempts are saved.
    #[must_use]
    pub fn progress_record(&self, now: DateTime<Utc>) -> Option<ProgressRecord> {
        (self.phase == SessionPhase::InProgress).then(|| {
            ProgressRecord::new(
                self.quiz.id().clone(),
                self.answers.clone(),
                self.current,
                now,
            )
        })
    }

    /// Leave the exam start gate.
    ///
    /// # Errors
    ///
    /// `NotExamMode` for practice attempts, otherwise a phase error unless the
    /// attempt is `AwaitingStart`.
    pub fn start_exam(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.mode.is_exam() {
            return Err(SessionError::NotExamMode);
        }
        match self.phase {
            SessionPhase::AwaitingStart => {
                self.phase = SessionPhase::InProgress;
                self.started_at = Some(now);
                Ok(())
            }
            SessionPhase::InProgress => Err(SessionError::AlreadyStarted),
            other => Err(self.phase_error(other)),
        }
    }

    /// Abandon an exam at the start gate. Nothing is persisted.
    ///
    /// # Errors
    ///
    /// `NotExamMode` for practice attempts, a phase error once started.
    pub fn cancel_start(&mut self) -> Result<(), SessionError> {
        if !self.mode.is_exam() {
            return Err(SessionError::NotExamMode);
        }
        match self.phase {
            SessionPhase::AwaitingStart => {
                self.phase = SessionPhase::Cancelled;
                Ok(())
            }
            SessionPhase::InProgress => Err(SessionError::AlreadyStarted),
            other => Err(self.phase_error(other)),
        }
    }

    /// Record `option` for the current question, replacing any earlier choice.
    ///
    /// Returns `Ok(false)` without changing anything once submitted.
    ///
    /// # Errors
    ///
    /// `NotStarted` or `Cancelled` outside an active attempt, `ViolationPending`
    /// until a fullscreen violation is resolved, `InvalidOption` if the
    /// question has no such option.
    pub fn select_option(&mut self, option: usize) -> Result<bool, SessionError> {
        match self.phase {
            SessionPhase::InProgress => self.ensure_no_violation()?,
            SessionPhase::Submitted | SessionPhase::Reviewing => return Ok(false),
            other => return Err(self.phase_error(other)),
        }
        let valid = self
            .current_question()
            .is_some_and(|question| question.has_option(option));
        if !valid {
            return Err(SessionError::InvalidOption { option });
        }
        Ok(self.answers.set(self.current, option))
    }

    /// Move forward one question; a no-op on the last question.
    ///
    /// # Errors
    ///
    /// `NotStarted` before the exam gate, `Cancelled` after cancelling.
    pub fn go_to_next(&mut self) -> Result<bool, SessionError> {
        self.ensure_navigable()?;
        if self.current + 1 >= self.quiz.question_count() {
            return Ok(false);
        }
        self.current += 1;
        Ok(true)
    }

    /// Move back one question; a no-op on the first question.
    ///
    /// # Errors
    ///
    /// `NotStarted` before the exam gate, `Cancelled` after cancelling.
    pub fn go_to_previous(&mut self) -> Result<bool, SessionError> {
        self.ensure_navigable()?;
        if self.current == 0 {
            return Ok(false);
        }
        self.current -= 1;
        Ok(true)
    }

    /// Jump to any question, including while reviewing.
    ///
    /// # Errors
    ///
    /// `InvalidQuestionIndex` if `index` is out of range, `Cancelled` after
    /// cancelling, `ViolationPending` while a violation awaits an answer.
    pub fn jump_to(&mut self, index: usize) -> Result<bool, SessionError> {
        if self.phase == SessionPhase::Cancelled {
            return Err(SessionError::Cancelled);
        }
        self.ensure_no_violation()?;
        if index >= self.quiz.question_count() {
            return Err(SessionError::InvalidQuestionIndex { index });
        }
        let moved = index != self.current;
        self.current = index;
        Ok(moved)
    }

    /// Advance the countdown by one second, submitting on reaching zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Ignored;
        }
        let TimeRemaining::Seconds(left) = self.time_remaining else {
            return TickOutcome::Ignored;
        };

        let left = left.saturating_sub(1);
        self.time_remaining = TimeRemaining::Seconds(left);
        if left > 0 {
            return TickOutcome::Counting(left);
        }

        tracing::info!(quiz_id = %self.quiz.id(), "time is up, submitting");
        TickOutcome::Expired(self.finish(SubmitTrigger::Timeout, now))
    }

    /// Score and close the attempt.
    ///
    /// # Errors
    ///
    /// `UnansweredQuestions` for a plain learner submit with blanks (nothing
    /// changes), `ViolationPending` for any learner submit while a violation
    /// awaits an answer, a phase error unless the attempt is in progress.
    pub fn submit(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReport, SessionError> {
        match self.phase {
            SessionPhase::InProgress => {}
            SessionPhase::AwaitingStart => return Err(SessionError::NotStarted),
            other => return Err(self.phase_error(other)),
        }
        if matches!(trigger, SubmitTrigger::Learner | SubmitTrigger::LearnerConfirmed) {
            self.ensure_no_violation()?;
        }
        let unanswered = self.answers.unanswered_count();
        if unanswered > 0 && !trigger.is_forced() {
            return Err(SessionError::UnansweredQuestions { count: unanswered });
        }
        Ok(self.finish(trigger, now))
    }

    fn finish(&mut self, trigger: SubmitTrigger, now: DateTime<Utc>) -> SubmissionReport {
        let score = score_answers(&self.quiz, &self.answers);
        let time_taken_secs = self.started_at.map_or_else(
            || {
                self.quiz
                    .time_limit_seconds()
                    .map_or(FALLBACK_TIME_TAKEN_SECS, u64::from)
            },
            |started| whole_seconds_between(started, now),
        );

        self.phase = SessionPhase::Submitted;
        self.score = Some(score);
        self.submitted_at = Some(now);
        self.time_taken_secs = Some(time_taken_secs);
        self.violation_pending = false;

        tracing::info!(
            quiz_id = %self.quiz.id(),
            score = score.percent,
            time_taken_secs,
            ?trigger,
            "attempt submitted"
        );

        SubmissionReport {
            quiz_id: self.quiz.id().clone(),
            mode: self.mode,
            score,
            unanswered: self.answers.unanswered_count(),
            time_taken_secs,
            trigger,
            submitted_at: now,
        }
    }

    /// Reveal correctness after a practice submission, from the first question.
    ///
    /// # Errors
    ///
    /// `ReviewUnavailable` in exam mode, `NotSubmitted` before submission.
    pub fn review_answers(&mut self) -> Result<(), SessionError> {
        if self.mode.is_exam() {
            return Err(SessionError::ReviewUnavailable);
        }
        if !self.phase.is_submitted() {
            return Err(SessionError::NotSubmitted);
        }
        self.phase = SessionPhase::Reviewing;
        self.current = 0;
        Ok(())
    }

    /// Build the leaderboard entry for this attempt without recording it.
    ///
    /// # Errors
    ///
    /// `NotSubmitted`, `ResultAlreadySaved`, or `ParticipantNameRequired`
    /// for a blank name.
    pub fn prepare_result(
        &self,
        participant: &str,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, SessionError> {
        let (Some(score), Some(time_taken)) = (self.score, self.time_taken_secs) else {
            return Err(SessionError::NotSubmitted);
        };
        if self.result_saved.is_some() {
            return Err(SessionError::ResultAlreadySaved);
        }
        if participant.trim().is_empty() {
            return Err(SessionError::ParticipantNameRequired);
        }
        Ok(ResultRecord::new(
            self.quiz.id().clone(),
            participant,
            u32::from(score.percent),
            time_taken,
            now,
        )?)
    }

    pub fn mark_result_saved(&mut self, id: ResultId) {
        self.result_saved = Some(id);
    }

    /// Apply a fullscreen change reported by the host.
    ///
    /// Returns `true` when leaving fullscreen raised a violation: exam mode,
    /// in progress, none pending yet.
    pub fn fullscreen_changed(&mut self, active: bool) -> bool {
        self.fullscreen_active = active;
        if active
            || !self.mode.is_exam()
            || self.phase != SessionPhase::InProgress
            || self.violation_pending
        {
            return false;
        }
        self.violation_pending = true;
        tracing::warn!(quiz_id = %self.quiz.id(), "left fullscreen during exam");
        true
    }

    /// Fullscreen was left at our own request; never a violation.
    pub fn fullscreen_released(&mut self) {
        self.fullscreen_active = false;
    }

    /// The host refused a fullscreen request; the exam continues without it.
    pub fn fullscreen_denied(&mut self) {
        self.fullscreen_active = false;
        self.fullscreen_denied = true;
    }

    /// Act on the learner's answer to a pending violation.
    ///
    /// # Errors
    ///
    /// `NoViolationPending` if nothing is pending.
    pub fn resolve_violation(
        &mut self,
        choice: ViolationChoice,
        now: DateTime<Utc>,
    ) -> Result<ViolationResolution, SessionError> {
        if !self.violation_pending || self.phase != SessionPhase::InProgress {
            return Err(SessionError::NoViolationPending);
        }
        match choice {
            ViolationChoice::EndExam => Ok(ViolationResolution::Ended(
                self.finish(SubmitTrigger::Violation, now),
            )),
            ViolationChoice::ReturnToFullscreen => {
                self.violation_pending = false;
                Ok(ViolationResolution::Resumed)
            }
        }
    }

    fn ensure_navigable(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::AwaitingStart => Err(SessionError::NotStarted),
            SessionPhase::Cancelled => Err(SessionError::Cancelled),
            _ => self.ensure_no_violation(),
        }
    }

    // The violation prompt blocks the attempt until answered.
    fn ensure_no_violation(&self) -> Result<(), SessionError> {
        if self.violation_pending {
            return Err(SessionError::ViolationPending);
        }
        Ok(())
    }

    fn phase_error(&self, phase: SessionPhase) -> SessionError {
        match phase {
            SessionPhase::AwaitingStart => SessionError::NotStarted,
            SessionPhase::Cancelled => SessionError::Cancelled,
            SessionPhase::Submitted | SessionPhase::Reviewing => SessionError::AlreadySubmitted,
            SessionPhase::InProgress => SessionError::InvalidPhase {
                action: "continue",
                phase,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{QuestionDraft, QuizDraft};
    use quiz_core::time::fixed_now;

    fn build_quiz(correct: &[usize], time_limit: u32) -> Quiz {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, c)| {
                QuestionDraft::new(
                    u32::try_from(i).unwrap() + 1,
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    *c,
                )
            })
            .collect();
        QuizDraft {
            title: "Session".into(),
            time_limit,
            questions,
            ..QuizDraft::default()
        }
        .validate(QuizId::new("1"), fixed_now())
        .unwrap()
    }

    fn answer_all(session: &mut QuizSession, picks: &[usize]) {
        for (i, pick) in picks.iter().enumerate() {
            session.jump_to(i).unwrap();
            session.select_option(*pick).unwrap();
        }
    }

    #[test]
    fn practice_starts_in_progress_and_exam_waits() {
        let practice = QuizSession::open(build_quiz(&[0], 1), SessionMode::Practice, None, fixed_now());
        assert_eq!(practice.phase(), SessionPhase::InProgress);
        assert_eq!(practice.started_at(), Some(fixed_now()));
        assert!(practice.needs_timer());

        let exam = QuizSession::open(build_quiz(&[0], 1), SessionMode::Exam, None, fixed_now());
        assert_eq!(exam.phase(), SessionPhase::AwaitingStart);
        assert!(!exam.needs_timer());
        assert_eq!(exam.time_remaining(), TimeRemaining::Seconds(60));
    }

    #[test]
    fn scenario_a_full_marks() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1], 0), SessionMode::Practice, None, fixed_now());
        answer_all(&mut session, &[0, 1]);
        let report = session
            .submit(SubmitTrigger::Learner, fixed_now() + Duration::seconds(42))
            .unwrap();
        assert_eq!(report.score.percent, 100);
        assert_eq!(report.time_taken_secs, 42);
        assert!(session.is_submitted());
    }

    #[test]
    fn scoring_three_of_five() {
        let mut session = QuizSession::open(
            build_quiz(&[0, 1, 2, 3, 0], 0),
            SessionMode::Practice,
            None,
            fixed_now(),
        );
        answer_all(&mut session, &[0, 1, 2, 0, 1]);
        let report = session.submit(SubmitTrigger::Learner, fixed_now()).unwrap();
        assert_eq!(report.score.correct, 3);
        assert_eq!(report.score.percent, 60);
    }

    #[test]
    fn reselecting_overwrites_only_current_slot() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1, 2], 0), SessionMode::Practice, None, fixed_now());
        session.jump_to(1).unwrap();
        session.select_option(1).unwrap();
        session.select_option(2).unwrap();
        assert_eq!(session.answers().get(1), Some(2));
        assert_eq!(session.answers().get(0), None);
        assert_eq!(session.answers().get(2), None);
    }

    #[test]
    fn select_rejects_unknown_option() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        let err = session.select_option(4).unwrap_err();
        assert!(matches!(err, SessionError::InvalidOption { option: 4 }));
        assert_eq!(session.answers().answered_count(), 0);
    }

    #[test]
    fn scenario_b_learner_rejected_then_timeout_submits() {
        let mut session = QuizSession::open(
            build_quiz(&[0, 1, 2, 2], 1),
            SessionMode::Practice,
            None,
            fixed_now(),
        );
        session.jump_to(0).unwrap();
        session.select_option(0).unwrap();
        session.jump_to(1).unwrap();
        session.select_option(1).unwrap();
        session.jump_to(3).unwrap();
        session.select_option(2).unwrap();
        let before = session.answers().clone();

        let err = session.submit(SubmitTrigger::Learner, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::UnansweredQuestions { count: 1 }));
        assert!(!session.is_submitted());
        assert_eq!(session.answers(), &before);

        let mut outcome = TickOutcome::Ignored;
        for _ in 0..60 {
            outcome = session.tick(fixed_now());
        }
        let TickOutcome::Expired(report) = outcome else {
            panic!("expected expiry, got {outcome:?}");
        };
        assert_eq!(report.trigger, SubmitTrigger::Timeout);
        assert_eq!(report.score.correct, 3);
        assert_eq!(report.score.percent, 75);
        assert_eq!(report.unanswered, 1);
    }

    #[test]
    fn confirmed_learner_submit_forces_through() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1], 0), SessionMode::Practice, None, fixed_now());
        session.select_option(0).unwrap();
        let report = session
            .submit(SubmitTrigger::LearnerConfirmed, fixed_now())
            .unwrap();
        assert_eq!(report.score.percent, 50);
        assert!(matches!(
            session.submit(SubmitTrigger::LearnerConfirmed, fixed_now()),
            Err(SessionError::AlreadySubmitted)
        ));
    }

    #[test]
    fn navigation_clamps_at_edges() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1, 2], 0), SessionMode::Practice, None, fixed_now());
        assert!(!session.go_to_previous().unwrap());
        assert_eq!(session.current_index(), 0);
        assert!(session.go_to_next().unwrap());
        assert!(session.go_to_next().unwrap());
        assert!(!session.go_to_next().unwrap());
        assert_eq!(session.current_index(), 2);
        assert!(matches!(
            session.jump_to(3),
            Err(SessionError::InvalidQuestionIndex { index: 3 })
        ));
    }

    #[test]
    fn timer_exhaustion_after_sixty_ticks() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1], 1), SessionMode::Practice, None, fixed_now());
        for i in 1..60 {
            assert_eq!(session.tick(fixed_now()), TickOutcome::Counting(60 - i));
        }
        assert!(matches!(session.tick(fixed_now()), TickOutcome::Expired(_)));
        assert!(session.is_submitted());
        assert_eq!(session.time_remaining(), TimeRemaining::Seconds(0));
        assert_eq!(session.tick(fixed_now()), TickOutcome::Ignored);
        assert!(!session.needs_timer());
    }

    #[test]
    fn untimed_quiz_ignores_ticks() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        assert_eq!(session.tick(fixed_now()), TickOutcome::Ignored);
        assert_eq!(session.time_remaining(), TimeRemaining::Untimed);
        assert!(!session.needs_timer());
    }

    #[test]
    fn selection_after_submit_is_ignored() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        session.select_option(1).unwrap();
        session.submit(SubmitTrigger::Learner, fixed_now()).unwrap();
        assert!(!session.select_option(0).unwrap());
        assert_eq!(session.answers().get(0), Some(1));
    }

    #[test]
    fn restores_fresh_progress_and_skips_stale() {
        let quiz = build_quiz(&[0, 1, 2], 0);
        let mut answers = AnswerSheet::new(3);
        answers.set(1, 3);
        let record = ProgressRecord::new(quiz.id().clone(), answers.clone(), 1, fixed_now());

        let now = fixed_now() + Duration::hours(2);
        let session = QuizSession::open(quiz.clone(), SessionMode::Practice, Some(record.clone()), now);
        assert!(session.restored());
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.answers(), &answers);

        let later = fixed_now() + Duration::hours(25);
        let stale = QuizSession::open(quiz, SessionMode::Practice, Some(record), later);
        assert!(!stale.restored());
        assert_eq!(stale.answers().answered_count(), 0);
    }

    #[test]
    fn mismatched_progress_is_discarded() {
        let quiz = build_quiz(&[0, 1], 0);
        let record = ProgressRecord::new(quiz.id().clone(), AnswerSheet::new(5), 4, fixed_now());
        let session = QuizSession::open(quiz, SessionMode::Practice, Some(record), fixed_now());
        assert!(!session.restored());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn exam_gate_blocks_input_until_started() {
        let mut session = QuizSession::open(build_quiz(&[0, 1], 5), SessionMode::Exam, None, fixed_now());
        assert!(matches!(session.select_option(0), Err(SessionError::NotStarted)));
        assert!(matches!(session.go_to_next(), Err(SessionError::NotStarted)));
        assert!(matches!(
            session.submit(SubmitTrigger::Timeout, fixed_now()),
            Err(SessionError::NotStarted)
        ));
        assert_eq!(session.tick(fixed_now()), TickOutcome::Ignored);

        let started = fixed_now() + Duration::seconds(30);
        session.start_exam(started).unwrap();
        assert_eq!(session.started_at(), Some(started));
        assert!(session.needs_timer());
        assert!(matches!(session.start_exam(started), Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn cancel_start_closes_without_progress() {
        let mut session = QuizSession::open(build_quiz(&[0], 5), SessionMode::Exam, None, fixed_now());
        session.cancel_start().unwrap();
        assert_eq!(session.phase(), SessionPhase::Cancelled);
        assert!(session.progress_record(fixed_now()).is_none());
        assert!(matches!(session.start_exam(fixed_now()), Err(SessionError::Cancelled)));
    }

    #[test]
    fn practice_has_no_start_gate() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        assert!(matches!(session.start_exam(fixed_now()), Err(SessionError::NotExamMode)));
        assert!(matches!(session.cancel_start(), Err(SessionError::NotExamMode)));
    }

    #[test]
    fn scenario_c_violation_only_after_start() {
        let mut session = QuizSession::open(build_quiz(&[0, 1], 5), SessionMode::Exam, None, fixed_now());
        assert!(!session.fullscreen_changed(false));
        assert!(!session.violation_pending());

        session.start_exam(fixed_now()).unwrap();
        assert!(!session.fullscreen_changed(true));
        assert!(session.fullscreen_changed(false));
        assert!(session.violation_pending());
        assert!(!session.fullscreen_changed(false));
    }

    #[test]
    fn return_to_fullscreen_clears_violation() {
        let mut session = QuizSession::open(build_quiz(&[0, 1], 5), SessionMode::Exam, None, fixed_now());
        session.start_exam(fixed_now()).unwrap();
        session.fullscreen_changed(false);
        assert_eq!(
            session
                .resolve_violation(ViolationChoice::ReturnToFullscreen, fixed_now())
                .unwrap(),
            ViolationResolution::Resumed
        );
        assert!(!session.violation_pending());
        assert!(!session.is_submitted());
        assert!(matches!(
            session.resolve_violation(ViolationChoice::EndExam, fixed_now()),
            Err(SessionError::NoViolationPending)
        ));
    }

    #[test]
    fn end_exam_bypasses_unanswered_guard() {
        let mut session = QuizSession::open(build_quiz(&[0, 1], 5), SessionMode::Exam, None, fixed_now());
        session.start_exam(fixed_now()).unwrap();
        session.select_option(0).unwrap();
        session.fullscreen_changed(false);
        let ViolationResolution::Ended(report) = session
            .resolve_violation(ViolationChoice::EndExam, fixed_now() + Duration::seconds(9))
            .unwrap()
        else {
            panic!("expected exam to end");
        };
        assert_eq!(report.trigger, SubmitTrigger::Violation);
        assert_eq!(report.score.percent, 50);
        assert_eq!(report.time_taken_secs, 9);
        assert!(!session.fullscreen_changed(false));
    }

    #[test]
    fn pending_violation_blocks_learner_input() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1], 1), SessionMode::Exam, None, fixed_now());
        session.start_exam(fixed_now()).unwrap();
        session.select_option(0).unwrap();
        assert!(session.fullscreen_changed(false));

        assert!(matches!(session.select_option(1), Err(SessionError::ViolationPending)));
        assert!(matches!(session.go_to_next(), Err(SessionError::ViolationPending)));
        assert!(matches!(session.go_to_previous(), Err(SessionError::ViolationPending)));
        assert!(matches!(session.jump_to(1), Err(SessionError::ViolationPending)));
        for trigger in [SubmitTrigger::Learner, SubmitTrigger::LearnerConfirmed] {
            assert!(matches!(
                session.submit(trigger, fixed_now()),
                Err(SessionError::ViolationPending)
            ));
        }
        assert_eq!(session.answers().get(0), Some(0));
        assert_eq!(session.current_index(), 0);
        assert!(session.violation_pending());
        assert!(!session.is_submitted());

        // The clock keeps running behind the prompt.
        assert_eq!(session.tick(fixed_now()), TickOutcome::Counting(59));

        session
            .resolve_violation(ViolationChoice::ReturnToFullscreen, fixed_now())
            .unwrap();
        assert!(session.go_to_next().unwrap());
        assert!(session.select_option(1).unwrap());
    }

    #[test]
    fn timeout_still_submits_behind_violation_prompt() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 1), SessionMode::Exam, None, fixed_now());
        session.start_exam(fixed_now()).unwrap();
        session.fullscreen_changed(false);
        let report = session.submit(SubmitTrigger::Timeout, fixed_now()).unwrap();
        assert_eq!(report.trigger, SubmitTrigger::Timeout);
        assert!(!session.violation_pending());
    }

    #[test]
    fn practice_ignores_fullscreen_changes() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        assert!(!session.fullscreen_changed(false));
        assert!(!session.violation_pending());
    }

    #[test]
    fn review_resets_index_in_practice_only() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1], 0), SessionMode::Practice, None, fixed_now());
        assert!(matches!(session.review_answers(), Err(SessionError::NotSubmitted)));
        answer_all(&mut session, &[0, 0]);
        session.submit(SubmitTrigger::Learner, fixed_now()).unwrap();
        session.review_answers().unwrap();
        assert_eq!(session.phase(), SessionPhase::Reviewing);
        assert_eq!(session.current_index(), 0);
        assert!(session.answers_revealed());
        assert!(session.jump_to(1).unwrap());

        let mut exam = QuizSession::open(build_quiz(&[0], 5), SessionMode::Exam, None, fixed_now());
        exam.start_exam(fixed_now()).unwrap();
        exam.submit(SubmitTrigger::LearnerConfirmed, fixed_now()).unwrap();
        assert!(matches!(exam.review_answers(), Err(SessionError::ReviewUnavailable)));
    }

    #[test]
    fn prepare_result_validates_name_and_saves_once() {
        let mut session =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        assert!(matches!(
            session.prepare_result("Ana", fixed_now()),
            Err(SessionError::NotSubmitted)
        ));
        session.select_option(0).unwrap();
        session.submit(SubmitTrigger::Learner, fixed_now()).unwrap();

        assert!(matches!(
            session.prepare_result("   ", fixed_now()),
            Err(SessionError::ParticipantNameRequired)
        ));
        let record = session.prepare_result(" Ana ", fixed_now()).unwrap();
        assert_eq!(record.username(), "Ana");
        assert_eq!(record.score(), 100);
        session.mark_result_saved(record.id());
        assert!(matches!(
            session.prepare_result("Ana", fixed_now()),
            Err(SessionError::ResultAlreadySaved)
        ));
    }

    #[test]
    fn time_taken_falls_back_without_start() {
        let mut timed = QuizSession::open(build_quiz(&[0], 3), SessionMode::Practice, None, fixed_now());
        timed.started_at = None;
        timed.select_option(0).unwrap();
        let report = timed.submit(SubmitTrigger::Learner, fixed_now()).unwrap();
        assert_eq!(report.time_taken_secs, 180);

        let mut untimed =
            QuizSession::open(build_quiz(&[0], 0), SessionMode::Practice, None, fixed_now());
        untimed.started_at = None;
        untimed.select_option(0).unwrap();
        let report = untimed.submit(SubmitTrigger::Learner, fixed_now()).unwrap();
        assert_eq!(report.time_taken_secs, FALLBACK_TIME_TAKEN_SECS);
    }

    #[test]
    fn progress_view_counts_answers() {
        let mut session =
            QuizSession::open(build_quiz(&[0, 1, 2, 3], 0), SessionMode::Practice, None, fixed_now());
        session.select_option(0).unwrap();
        session.go_to_next().unwrap();
        let progress = session.progress();
        assert_eq!(progress.total, 4);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.unanswered, 3);
        assert_eq!(progress.current, 1);
        assert!(!progress.is_complete);
        assert_eq!(progress.percent_answered(), 25);

        let record = session.progress_record(fixed_now()).unwrap();
        assert_eq!(record.current_question_index, 1);
        assert_eq!(record.answers.get(0), Some(0));
    }
}
