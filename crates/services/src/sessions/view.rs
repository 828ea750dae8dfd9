use serde::Serialize;

use quiz_core::model::QuizId;
use quiz_core::scoring::ScoreBreakdown;

use super::progress::SessionProgress;
use super::service::{QuizSession, SessionMode, SessionPhase, TimeRemaining};

/// Presentation-agnostic view of a session at one instant.
///
/// No pre-formatted strings: front ends decide how to render the countdown,
/// the options and the correctness markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub quiz_id: QuizId,
    pub title: String,
    pub mode: SessionMode,
    pub phase: SessionPhase,
    pub question_number: usize,
    pub prompt: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    /// Only present while reviewing answers.
    pub correct_answer: Option<usize>,
    pub time_remaining: TimeRemaining,
    pub progress: SessionProgress,
    pub violation_pending: bool,
    pub fullscreen_active: bool,
    pub score: Option<ScoreBreakdown>,
    pub time_taken_secs: Option<u64>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        let question = session.current_question();
        let revealed = session.answers_revealed();
        Self {
            quiz_id: session.quiz_id().clone(),
            title: session.quiz().title().to_owned(),
            mode: session.mode(),
            phase: session.phase(),
            question_number: session.current_index() + 1,
            prompt: question.map(|q| q.prompt().to_owned()).unwrap_or_default(),
            options: question.map(|q| q.options().to_vec()).unwrap_or_default(),
            selected: session.answers().get(session.current_index()),
            correct_answer: question.filter(|_| revealed).map(|q| q.correct_answer()),
            time_remaining: session.time_remaining(),
            progress: session.progress(),
            violation_pending: session.violation_pending(),
            fullscreen_active: session.fullscreen_active(),
            score: session.score(),
            time_taken_secs: session.time_taken_secs(),
        }
    }

    /// Whether the selected option is correct, once answers are revealed.
    #[must_use]
    pub fn selected_is_correct(&self) -> Option<bool> {
        self.correct_answer
            .map(|correct| self.selected == Some(correct))
    }
}
