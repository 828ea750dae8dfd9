mod answers;
mod ids;
mod progress;
mod quiz;
mod result;

pub use answers::{AnswerSheet, AnswerSheetError, UNANSWERED};
pub use ids::{ParseIdError, QuestionId, QuizId, ResultId};
pub use progress::{PROGRESS_FRESHNESS_HOURS, ProgressRecord, ProgressValue};
pub use quiz::{Difficulty, Question, QuestionDraft, Quiz, QuizDraft, QuizError};
pub use result::{ResultError, ResultRecord};
