use serde::Serialize;

/// Aggregated view of attempt progress, useful for progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub current: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Answered share in whole percent, rounded down.
    #[must_use]
    pub fn percent_answered(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        u8::try_from(self.answered * 100 / self.total).unwrap_or(100)
    }
}
