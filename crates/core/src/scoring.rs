use serde::Serialize;

use crate::model::{AnswerSheet, Quiz};

/// Outcome of grading an answer sheet against a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub correct: usize,
    pub total: usize,
    /// `round(100 * correct / total)`, half rounds up.
    pub percent: u8,
}

impl ScoreBreakdown {
    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.total - self.correct
    }
}

/// Grade `answers` against `quiz`. Unanswered slots count as incorrect.
#[must_use]
pub fn score_answers(quiz: &Quiz, answers: &AnswerSheet) -> ScoreBreakdown {
    let correct = quiz
        .questions()
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(*i).is_some_and(|option| q.is_correct(option)))
        .count();
    let total = quiz.question_count();

    ScoreBreakdown {
        correct,
        total,
        percent: percentage(correct, total),
    }
}

/// Integer percentage rounded half-up. Returns 0 when `total` is 0.
#[must_use]
pub fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}
