use std::sync::Arc;

use quiz_core::QuizSettings;
use quiz_core::model::{
    AnswerId, QuizError, QuizKind, QuizSession, QuizState, QuizStep, Score, TopicId, TopicProgress,
};
use quiz_core::unlock::{self, SelectDecision};
use storage::catalog::CatalogSnapshot;
use tracing::{debug, info};

use super::sampler::FinalTestSampler;
use crate::error::QuizServiceError;
use crate::progress_service::ProgressService;

/// What happened after moving forward in a quiz.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    Advanced { index: usize },
    TopicFinished { score: Score, progress: TopicProgress },
    FinalTestFinished { score: Score, best: Score },
}

/// Starts quizzes, enforces access rules and persists finished runs.
#[derive(Clone)]
pub struct QuizLoopService {
    catalog: Arc<CatalogSnapshot>,
    progress: ProgressService,
    sampler: FinalTestSampler,
    settings: QuizSettings,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        catalog: Arc<CatalogSnapshot>,
        progress: ProgressService,
        settings: QuizSettings,
    ) -> Self {
        Self {
            catalog,
            progress,
            sampler: FinalTestSampler::new(),
            settings,
        }
    }

    #[must_use]
    pub fn with_sampler(mut self, sampler: FinalTestSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Open a topic (video or test) and mark it active.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTopic`, `TopicLocked` when earlier topics are not passed,
    /// or `TopicBusy` while another unfinished topic is active.
    pub async fn enter_topic(&self, topic_id: &TopicId) -> Result<(), QuizServiceError> {
        let catalog = self.catalog.catalog();
        if catalog.topic(topic_id).is_none() {
            return Err(QuizServiceError::UnknownTopic(topic_id.clone()));
        }
        let progress = self.progress.get_all().await?;
        if !unlock::is_topic_unlocked(topic_id, catalog, &progress) {
            return Err(QuizServiceError::TopicLocked(topic_id.clone()));
        }
        if let SelectDecision::Refused { active } = self.progress.select_decision(topic_id).await? {
            return Err(QuizServiceError::TopicBusy { active });
        }
        // Completed topics can be reviewed without claiming the active slot.
        if !progress.is_completed(topic_id) {
            self.progress.set_active_topic(topic_id).await?;
        }
        Ok(())
    }

    /// Enter a topic and build a started quiz over its questions in display order.
    ///
    /// # Errors
    ///
    /// Returns the `enter_topic` errors, or `QuizError::Empty` when the topic
    /// has no questions.
    pub async fn start_topic_test(&self, topic_id: &TopicId) -> Result<QuizSession, QuizServiceError> {
        self.enter_topic(topic_id).await?;
        let questions = self.catalog.questions_for_topic(topic_id);
        let mut session = QuizSession::new(QuizKind::Topic(topic_id.clone()), questions)?;
        session.start()?;
        debug!(topic_id = %topic_id, questions = session.total(), "topic test started");
        Ok(session)
    }

    /// Build a started final test from a fresh random draw over all questions.
    ///
    /// # Errors
    ///
    /// Returns `FinalTestLocked` until every topic is completed, or
    /// `QuizError::Empty` when there are no questions.
    pub async fn start_final_test(&self) -> Result<QuizSession, QuizServiceError> {
        let progress = self.progress.get_all().await?;
        let topic_ids = self.catalog.catalog().topic_ids();
        if !unlock::can_access_final_test(&topic_ids, &progress) {
            let overall = unlock::overall_progress(&topic_ids, &progress);
            return Err(QuizServiceError::FinalTestLocked {
                completed: overall.completed,
                total: overall.total,
            });
        }
        let mut session = self.draw_final_test()?;
        session.start()?;
        info!(questions = session.total(), "final test started");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `QuizError` if the answer does not belong to the current question
    /// or the session is not running.
    pub fn select_answer(
        &self,
        session: &mut QuizSession,
        answer_id: AnswerId,
    ) -> Result<(), QuizServiceError> {
        session.select_answer(answer_id)?;
        Ok(())
    }

    /// Move forward. Finishing a run persists its score.
    ///
    /// The score is saved before the session is marked finished, so a failed
    /// save leaves the run on its last question and `next` can be retried.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for state violations or `Progress` if saving fails.
    pub async fn next(&self, session: &mut QuizSession) -> Result<QuizOutcome, QuizServiceError> {
        let Some(score) = session.pending_score() else {
            return match session.next()? {
                QuizStep::Advanced { index } => Ok(QuizOutcome::Advanced { index }),
                QuizStep::Finished { score } => self.persist(session.kind(), score).await,
            };
        };
        let outcome = self.persist(session.kind(), score).await?;
        session.next()?;
        Ok(outcome)
    }

    async fn persist(&self, kind: &QuizKind, score: Score) -> Result<QuizOutcome, QuizServiceError> {
        match kind {
            QuizKind::Topic(topic_id) => {
                let progress = self.progress.record(topic_id, score).await?;
                Ok(QuizOutcome::TopicFinished { score, progress })
            }
            QuizKind::FinalTest => {
                self.progress.record_final_test_score(score).await?;
                let best = self.progress.best_final_test_score().await?;
                Ok(QuizOutcome::FinalTestFinished { score, best })
            }
        }
    }

    /// # Errors
    ///
    /// Returns `QuizError` if the session is not running.
    pub fn previous(&self, session: &mut QuizSession) -> Result<usize, QuizServiceError> {
        Ok(session.previous()?)
    }

    /// Run a quiz again from the first question.
    ///
    /// Goes through the same gates as starting it: topic tests re-enter the
    /// topic and keep their ordered questions, final tests re-check access and
    /// draw a new sample. On error the session is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InProgress` while the run is underway, or the
    /// `start_topic_test` / `start_final_test` errors.
    pub async fn restart(&self, session: &mut QuizSession) -> Result<(), QuizServiceError> {
        if matches!(session.state(), QuizState::InProgress { .. }) {
            return Err(QuizError::InProgress.into());
        }
        let fresh = match session.kind() {
            QuizKind::Topic(topic_id) => self.start_topic_test(topic_id).await?,
            QuizKind::FinalTest => self.start_final_test().await?,
        };
        *session = fresh;
        Ok(())
    }

    fn draw_final_test(&self) -> Result<QuizSession, QuizServiceError> {
        let pool = self.catalog.all_questions().to_vec();
        let picked = self.sampler.sample(pool, self.settings.final_test_size());
        Ok(QuizSession::new(QuizKind::FinalTest, picked)?)
    }
}
