use std::sync::Arc;

use quiz_core::QuizSettings;
use storage::catalog::{CatalogSnapshot, CatalogSource};
use storage::repository::Storage;
use tracing::info;

use crate::access_service::AccessService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quiz::{FinalTestSampler, QuizLoopService};

/// Assembles app-facing services over one catalog snapshot and one store.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogSnapshot>,
    progress: Arc<ProgressService>,
    access: Arc<AccessService>,
    quiz_loop: Arc<QuizLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or catalog loading fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: &dyn CatalogSource,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let snapshot = catalog.load().await?;
        info!(
            lessons = snapshot.catalog().lessons().len(),
            topics = snapshot.catalog().ordered_topics().len(),
            questions = snapshot.all_questions().len(),
            "catalog loaded"
        );
        Ok(Self::from_parts(storage, snapshot, settings))
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog cannot be loaded.
    pub async fn in_memory(
        catalog: &dyn CatalogSource,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let snapshot = catalog.load().await?;
        Ok(Self::from_parts(Storage::in_memory(), snapshot, settings))
    }

    #[must_use]
    pub fn from_parts(storage: Storage, snapshot: CatalogSnapshot, settings: QuizSettings) -> Self {
        let catalog = Arc::new(snapshot);
        let progress = ProgressService::new(Arc::clone(&storage.progress));
        let access = Arc::new(AccessService::new(
            Arc::clone(&catalog),
            progress.clone(),
            settings.clone(),
        ));
        let quiz_loop = Arc::new(QuizLoopService::new(
            Arc::clone(&catalog),
            progress.clone(),
            settings,
        ));
        Self {
            catalog,
            progress: Arc::new(progress),
            access,
            quiz_loop,
        }
    }

    /// Replace the final test sampler, e.g. with a seeded one.
    #[must_use]
    pub fn with_sampler(mut self, sampler: FinalTestSampler) -> Self {
        let quiz_loop = (*self.quiz_loop).clone().with_sampler(sampler);
        self.quiz_loop = Arc::new(quiz_loop);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn access(&self) -> Arc<AccessService> {
        Arc::clone(&self.access)
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }
}
