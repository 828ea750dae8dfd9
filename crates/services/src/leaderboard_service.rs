use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{QuizId, ResultId, ResultRecord};
use storage::repository::{QuizRepository, ResultRepository};

use crate::error::LeaderboardError;

/// Column a leaderboard listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaderboardSort {
    #[default]
    Score,
    TimeTaken,
    CompletedAt,
    Participant,
    QuizTitle,
}

impl FromStr for LeaderboardSort {
    type Err = LeaderboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "time" | "timetaken" => Ok(Self::TimeTaken),
            "date" | "completedat" => Ok(Self::CompletedAt),
            "participant" | "username" | "name" => Ok(Self::Participant),
            "quiz" | "title" => Ok(Self::QuizTitle),
            _ => Err(LeaderboardError::UnknownSortKey(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Filters and ordering for [`LeaderboardService::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub quiz_id: Option<QuizId>,
    /// Case-insensitive substring of the participant name.
    pub participant: Option<String>,
    pub sort: LeaderboardSort,
    pub direction: SortDirection,
}

/// Result row joined with the quiz title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: ResultId,
    pub quiz_id: QuizId,
    /// Falls back to the quiz id when the quiz is no longer in the catalog.
    pub quiz_title: String,
    pub participant: String,
    pub score: u8,
    pub time_taken_secs: u64,
    pub completed_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    fn from_record(record: &ResultRecord, titles: &HashMap<QuizId, String>) -> Self {
        Self {
            id: record.id(),
            quiz_id: record.quiz_id().clone(),
            quiz_title: titles
                .get(record.quiz_id())
                .cloned()
                .unwrap_or_else(|| record.quiz_id().to_string()),
            participant: record.username().to_owned(),
            score: record.score(),
            time_taken_secs: record.time_taken_secs(),
            completed_at: record.completed_at(),
        }
    }
}

/// Read side of the results store.
#[derive(Clone)]
pub struct LeaderboardService {
    quizzes: Arc<dyn QuizRepository>,
    results: Arc<dyn ResultRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizRepository>, results: Arc<dyn ResultRepository>) -> Self {
        Self { quizzes, results }
    }

    /// Filtered, sorted leaderboard.
    ///
    /// Ties keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if either store fails.
    pub async fn list(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let titles = self.quiz_titles().await?;
        let needle = query
            .participant
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);

        let mut entries: Vec<LeaderboardEntry> = self
            .results
            .list_results()
            .await?
            .iter()
            .filter(|r| query.quiz_id.as_ref().is_none_or(|id| r.quiz_id() == id))
            .filter(|r| {
                needle
                    .as_deref()
                    .is_none_or(|n| r.username().to_lowercase().contains(n))
            })
            .map(|r| LeaderboardEntry::from_record(r, &titles))
            .collect();

        entries.sort_by(|a, b| {
            let ord = compare(a, b, query.sort);
            match query.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        Ok(entries)
    }

    /// Best `limit` results across all quizzes, faster time breaking ties.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if either store fails.
    pub async fn top_performers(
        &self,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        self.top_matching(&LeaderboardQuery::default(), limit).await
    }

    /// Best `limit` results among those passing the quiz and participant
    /// filters of `query`. Its sort settings are ignored.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if either store fails.
    pub async fn top_matching(
        &self,
        query: &LeaderboardQuery,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let mut entries = self.list(query).await?;
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.time_taken_secs.cmp(&b.time_taken_secs))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    async fn quiz_titles(&self) -> Result<HashMap<QuizId, String>, LeaderboardError> {
        Ok(self
            .quizzes
            .list_quizzes()
            .await?
            .into_iter()
            .map(|q| (q.id().clone(), q.title().to_owned()))
            .collect())
    }
}

fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry, sort: LeaderboardSort) -> Ordering {
    match sort {
        LeaderboardSort::Score => a.score.cmp(&b.score),
        LeaderboardSort::TimeTaken => a.time_taken_secs.cmp(&b.time_taken_secs),
        LeaderboardSort::CompletedAt => a.completed_at.cmp(&b.completed_at),
        LeaderboardSort::Participant => a
            .participant
            .to_lowercase()
            .cmp(&b.participant.to_lowercase()),
        LeaderboardSort::QuizTitle => a.quiz_title.to_lowercase().cmp(&b.quiz_title.to_lowercase()),
    }
}
