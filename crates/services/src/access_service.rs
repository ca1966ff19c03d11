use std::sync::Arc;

use quiz_core::QuizSettings;
use quiz_core::model::{Lesson, LessonId, Question, Score, Topic, TopicId};
use quiz_core::unlock::{self, LessonProgress, OverallProgress, TopicState};
use storage::catalog::CatalogSnapshot;

use crate::error::ProgressServiceError;
use crate::progress_service::ProgressService;

/// One topic as shown in a lesson listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicOverview {
    pub topic: Topic,
    pub state: TopicState,
    pub best_score: Score,
    pub question_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonOverview {
    pub lesson: Lesson,
    pub unlocked: bool,
    pub progress: LessonProgress,
    pub topics: Vec<TopicOverview>,
}

/// Everything a home screen needs in one read.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseOverview {
    pub lessons: Vec<LessonOverview>,
    pub overall: OverallProgress,
    pub active_topic: Option<TopicId>,
    pub final_test_unlocked: bool,
    pub best_final_test_score: Score,
}

/// Read-side queries combining the catalog with stored progress.
#[derive(Clone)]
pub struct AccessService {
    catalog: Arc<CatalogSnapshot>,
    progress: ProgressService,
    settings: QuizSettings,
}

impl AccessService {
    #[must_use]
    pub fn new(
        catalog: Arc<CatalogSnapshot>,
        progress: ProgressService,
        settings: QuizSettings,
    ) -> Self {
        Self {
            catalog,
            progress,
            settings,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if progress cannot be read.
    pub async fn is_topic_unlocked(&self, topic_id: &TopicId) -> Result<bool, ProgressServiceError> {
        let progress = self.progress.get_all().await?;
        Ok(unlock::is_topic_unlocked(
            topic_id,
            self.catalog.catalog(),
            &progress,
        ))
    }

    #[must_use]
    pub fn is_lesson_unlocked(&self, lesson_id: &LessonId) -> bool {
        unlock::is_lesson_unlocked(lesson_id, self.catalog.catalog())
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if progress cannot be read.
    pub async fn lesson_progress(
        &self,
        lesson_id: &LessonId,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let progress = self.progress.get_all().await?;
        Ok(unlock::lesson_progress(
            lesson_id,
            self.catalog.catalog(),
            &progress,
        ))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if progress cannot be read.
    pub async fn can_access_final_test(&self) -> Result<bool, ProgressServiceError> {
        let progress = self.progress.get_all().await?;
        Ok(unlock::can_access_final_test(
            &self.catalog.catalog().topic_ids(),
            &progress,
        ))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if progress cannot be read.
    pub async fn overall_progress(&self) -> Result<OverallProgress, ProgressServiceError> {
        let progress = self.progress.get_all().await?;
        Ok(unlock::overall_progress(
            &self.catalog.catalog().topic_ids(),
            &progress,
        ))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError` if progress cannot be read.
    pub async fn topic_state(&self, topic_id: &TopicId) -> Result<TopicState, ProgressServiceError> {
        let active = self.progress.active_topic().await?;
        let progress = self.progress.get_all().await?;
        Ok(unlock::topic_state(
            topic_id,
            self.catalog.catalog(),
            &progress,
            active.as_ref(),
        ))
    }

    /// Lessons with per-topic state, overall completion and final test status.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if progress cannot be read.
    pub async fn overview(&self) -> Result<CourseOverview, ProgressServiceError> {
        let active = self.progress.active_topic().await?;
        let progress = self.progress.get_all().await?;
        let catalog = self.catalog.catalog();
        let topic_ids = catalog.topic_ids();

        let lessons = catalog
            .lessons()
            .iter()
            .map(|lesson| {
                let topics = catalog
                    .topics_in_lesson(&lesson.id)
                    .map(|topic| TopicOverview {
                        state: unlock::topic_state(&topic.id, catalog, &progress, active.as_ref()),
                        best_score: progress.best_score(&topic.id),
                        question_count: self.catalog.question_count(&topic.id),
                        topic: topic.clone(),
                    })
                    .collect();
                LessonOverview {
                    lesson: lesson.clone(),
                    unlocked: unlock::is_lesson_unlocked(&lesson.id, catalog),
                    progress: unlock::lesson_progress(&lesson.id, catalog, &progress),
                    topics,
                }
            })
            .collect();

        Ok(CourseOverview {
            lessons,
            overall: unlock::overall_progress(&topic_ids, &progress),
            active_topic: active,
            final_test_unlocked: unlock::can_access_final_test(&topic_ids, &progress),
            best_final_test_score: self.progress.best_final_test_score().await?,
        })
    }

    /// Absolute image location for a question, when an image base is configured.
    #[must_use]
    pub fn image_url(&self, question: &Question) -> Option<String> {
        self.settings
            .image_base()
            .and_then(|base| base.resolve(question.image_path.as_deref()))
            .map(String::from)
    }
}
