use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::QuizCatalogService;
use crate::error::AppServicesError;
use crate::identity::IdentityProvider;
use crate::leaderboard_service::LeaderboardService;
use crate::progress_service::ProgressService;
use crate::sessions::QuizAttemptService;

/// Assembles app-facing services over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    attempts: Arc<QuizAttemptService>,
    catalog: Arc<QuizCatalogService>,
    leaderboard: Arc<LeaderboardService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(db_url, "storage ready");
        Ok(Self::from_storage(&storage, clock, identity))
    }

    /// Build services over process-local storage.
    #[must_use]
    pub fn in_memory(clock: Clock, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, identity)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let attempts = Arc::new(QuizAttemptService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.results),
            identity,
        ));
        let catalog = Arc::new(QuizCatalogService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.share_codes),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.results),
        ));
        let progress = Arc::new(ProgressService::new(clock, Arc::clone(&storage.progress)));

        Self {
            attempts,
            catalog,
            leaderboard,
            progress,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<QuizAttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<QuizCatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
