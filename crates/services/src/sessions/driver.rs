//! Single-owner actor around a `QuizSession`.
//!
//! Learner input, countdown ticks and fullscreen changes all arrive on one
//! command channel and are applied strictly in order by one task. Front ends
//! hold a [`SessionHandle`] and read [`SessionNotice`]s.

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{QuizId, ResultRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::service::{QuizSession, SessionMode, SubmissionReport, SubmitTrigger, ViolationChoice};
use super::timer::SessionTimer;
use super::view::SessionSnapshot;
use super::workflow::{QuizAttemptService, SubmitOutcome};
use crate::error::SessionError;
use crate::proctor::FullscreenProctor;

const COMMAND_BUFFER: usize = 32;
const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select(usize),
    Next,
    Previous,
    JumpTo(usize),
    StartExam,
    CancelStart,
    /// `confirmed` forces through unanswered questions.
    Submit { confirmed: bool },
    ResolveViolation(ViolationChoice),
    Review,
    SaveResult { participant: String },
    FullscreenChanged { active: bool },
    Tick,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionWarning {
    UnansweredQuestions { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Opened { restored: bool },
    State(SessionSnapshot),
    Countdown(u32),
    Warning(SessionWarning),
    ViolationRaised,
    FullscreenUnavailable(String),
    Submitted(SubmissionReport),
    ResultSaved(ResultRecord),
    Rejected(String),
    Closed,
}

/// Sending side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::DriverClosed` once the session has ended.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::DriverClosed)
    }

    /// Extra sender for input sources running on other tasks.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    /// Wait for the driver task to finish.
    pub async fn closed(self) {
        drop(self.commands);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "session driver task failed");
        }
    }
}

pub struct SessionDriver {
    attempts: Arc<QuizAttemptService>,
    proctor: Arc<dyn FullscreenProctor>,
    session: QuizSession,
    restored: bool,
    commands: mpsc::Receiver<SessionCommand>,
    ticks: mpsc::WeakSender<SessionCommand>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    timer: Option<SessionTimer>,
    tick_period: Duration,
}

impl SessionDriver {
    /// Open an attempt and spawn its driver task.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuizNotFound` or a store error; no task is
    /// spawned in that case.
    pub async fn spawn(
        attempts: Arc<QuizAttemptService>,
        proctor: Arc<dyn FullscreenProctor>,
        quiz_id: &QuizId,
        mode: SessionMode,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<SessionNotice>), SessionError> {
        Self::spawn_with_period(attempts, proctor, quiz_id, mode, TICK_PERIOD).await
    }

    /// Like [`SessionDriver::spawn`] with a custom countdown period.
    ///
    /// # Errors
    ///
    /// Same as [`SessionDriver::spawn`].
    pub async fn spawn_with_period(
        attempts: Arc<QuizAttemptService>,
        proctor: Arc<dyn FullscreenProctor>,
        quiz_id: &QuizId,
        mode: SessionMode,
        tick_period: Duration,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<SessionNotice>), SessionError> {
        let opened = attempts.open_attempt(quiz_id, mode).await?;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let driver = Self {
            attempts,
            proctor,
            session: opened.session,
            restored: opened.restored,
            commands: command_rx,
            ticks: command_tx.downgrade(),
            notices: notice_tx,
            timer: None,
            tick_period,
        };
        let task = tokio::spawn(driver.run());

        Ok((
            SessionHandle {
                commands: command_tx,
                task,
            },
            notice_rx,
        ))
    }

    async fn run(mut self) {
        self.emit(SessionNotice::Opened {
            restored: self.restored,
        });
        self.emit_state();
        self.sync_timer();

        while let Some(command) = self.commands.recv().await {
            if !self.handle(command).await {
                break;
            }
        }

        self.teardown().await;
        self.emit(SessionNotice::Closed);
    }

    /// Returns `false` when the session should close.
    async fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Select(option) => {
                let result = self.attempts.select_option(&mut self.session, option).await;
                self.after_edit(result);
            }
            SessionCommand::Next => {
                let result = self.attempts.go_to_next(&mut self.session).await;
                self.after_edit(result);
            }
            SessionCommand::Previous => {
                let result = self.attempts.go_to_previous(&mut self.session).await;
                self.after_edit(result);
            }
            SessionCommand::JumpTo(index) => {
                let result = self.attempts.jump_to(&mut self.session, index).await;
                self.after_edit(result);
            }
            SessionCommand::StartExam => match self.attempts.start_exam(&mut self.session) {
                Ok(()) => {
                    self.request_fullscreen().await;
                    self.sync_timer();
                    self.emit_state();
                }
                Err(err) => self.reject(&err),
            },
            SessionCommand::CancelStart => match self.attempts.cancel_start(&mut self.session) {
                Ok(()) => {
                    self.emit_state();
                    return false;
                }
                Err(err) => self.reject(&err),
            },
            SessionCommand::Submit { confirmed } => {
                let trigger = if confirmed {
                    SubmitTrigger::LearnerConfirmed
                } else {
                    SubmitTrigger::Learner
                };
                match self.attempts.submit(&mut self.session, trigger).await {
                    Ok(outcome) => self.after_submit(outcome).await,
                    Err(SessionError::UnansweredQuestions { count }) => {
                        self.emit(SessionNotice::Warning(
                            SessionWarning::UnansweredQuestions { count },
                        ));
                    }
                    Err(err) => self.reject(&err),
                }
            }
            SessionCommand::ResolveViolation(choice) => {
                match self.attempts.resolve_violation(&mut self.session, choice).await {
                    Ok(Some(outcome)) => self.after_submit(outcome).await,
                    Ok(None) => {
                        self.request_fullscreen().await;
                        self.emit_state();
                    }
                    Err(err) => self.reject(&err),
                }
            }
            SessionCommand::Review => match self.attempts.review_answers(&mut self.session) {
                Ok(()) => self.emit_state(),
                Err(err) => self.reject(&err),
            },
            SessionCommand::SaveResult { participant } => {
                match self.attempts.save_result(&mut self.session, &participant).await {
                    Ok(record) => self.emit(SessionNotice::ResultSaved(record)),
                    Err(err) => self.reject(&err),
                }
            }
            SessionCommand::FullscreenChanged { active } => {
                if self.session.fullscreen_changed(active) {
                    self.emit(SessionNotice::ViolationRaised);
                }
                self.emit_state();
            }
            SessionCommand::Tick => {
                if let Some(outcome) = self.attempts.tick(&mut self.session).await {
                    self.after_submit(outcome).await;
                } else if let Some(left) = self
                    .session
                    .time_remaining()
                    .seconds()
                    .filter(|_| self.session.needs_timer())
                {
                    self.emit(SessionNotice::Countdown(left));
                }
            }
            SessionCommand::Leave => return false,
        }
        true
    }

    fn after_edit(&mut self, result: Result<bool, SessionError>) {
        match result {
            Ok(_) => self.emit_state(),
            Err(err) => self.reject(&err),
        }
    }

    async fn after_submit(&mut self, outcome: SubmitOutcome) {
        self.sync_timer();
        self.release_fullscreen().await;
        self.emit(SessionNotice::Submitted(outcome.report));
        if let Some(record) = outcome.saved_result {
            self.emit(SessionNotice::ResultSaved(record));
        }
        self.emit_state();
    }

    /// Keep exactly one timer alive while the session needs a countdown.
    fn sync_timer(&mut self) {
        match (self.session.needs_timer(), self.timer.take()) {
            (true, Some(timer)) => self.timer = Some(timer),
            (true, None) => {
                self.timer = Some(SessionTimer::start(self.tick_period, self.ticks.clone()));
            }
            (false, Some(timer)) => timer.stop(),
            (false, None) => {}
        }
    }

    async fn request_fullscreen(&mut self) {
        match self.proctor.enter().await {
            Ok(()) => {
                self.session.fullscreen_changed(true);
            }
            Err(err) => {
                tracing::warn!(quiz_id = %self.session.quiz_id(), error = %err, "fullscreen unavailable");
                self.session.fullscreen_denied();
                self.emit(SessionNotice::FullscreenUnavailable(err.to_string()));
            }
        }
    }

    async fn release_fullscreen(&mut self) {
        if !self.session.fullscreen_active() {
            return;
        }
        if let Err(err) = self.proctor.exit().await {
            tracing::warn!(error = %err, "failed to leave fullscreen");
        }
        self.session.fullscreen_released();
    }

    /// Leaving keeps the last saved progress for resumption.
    async fn teardown(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        self.release_fullscreen().await;
        tracing::debug!(
            quiz_id = %self.session.quiz_id(),
            phase = %self.session.phase(),
            "session closed"
        );
    }

    fn reject(&self, err: &SessionError) {
        tracing::debug!(error = %err, "command rejected");
        self.emit(SessionNotice::Rejected(err.to_string()));
    }

    fn emit_state(&self) {
        self.emit(SessionNotice::State(SessionSnapshot::from_session(
            &self.session,
        )));
    }

    fn emit(&self, notice: SessionNotice) {
        // A front end that stopped listening does not stop the session.
        let _ = self.notices.send(notice);
    }
}
