use std::collections::HashMap;
use std::sync::Arc;

use quiz_core::model::{ProgressMap, Score, TopicId, TopicProgress};
use quiz_core::unlock::{self, SelectDecision};
use storage::repository::{ProgressRepository, StorageKey};
use tracing::{debug, info, warn};

use crate::error::ProgressServiceError;

/// Learner progress persisted through a key-value repository.
///
/// Each call loads what it needs and writes changes back before returning;
/// nothing is cached between calls.
#[derive(Clone)]
pub struct ProgressService {
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>) -> Self {
        Self { repo }
    }

    /// All topic progress. Absent or corrupt data reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the repository cannot be read.
    pub async fn get_all(&self) -> Result<ProgressMap, ProgressServiceError> {
        let Some(raw) = self.repo.load(StorageKey::Progress).await? else {
            return Ok(ProgressMap::new());
        };
        match serde_json::from_str::<HashMap<TopicId, TopicProgress>>(&raw) {
            Ok(records) => Ok(ProgressMap::from_persisted(records.into_values())),
            Err(err) => {
                warn!(key = %StorageKey::Progress, error = %err, "ignoring corrupt progress");
                Ok(ProgressMap::new())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the repository cannot be read.
    pub async fn get(
        &self,
        topic_id: &TopicId,
    ) -> Result<Option<TopicProgress>, ProgressServiceError> {
        Ok(self.get_all().await?.get(topic_id).cloned())
    }

    /// Record a quiz result for a topic.
    ///
    /// The best score only ever rises. Passing clears the active topic.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if loading or saving fails.
    pub async fn record(
        &self,
        topic_id: &TopicId,
        score: Score,
    ) -> Result<TopicProgress, ProgressServiceError> {
        let mut progress = self.get_all().await?;
        let was_completed = progress.is_completed(topic_id);
        let updated = progress.record(topic_id, score).clone();

        let encoded = serde_json::to_string(&progress)?;
        self.repo.save(StorageKey::Progress, &encoded).await?;
        debug!(
            topic_id = %topic_id,
            score = score.value(),
            best = updated.best_score().value(),
            "topic score recorded"
        );

        if updated.is_completed() {
            if !was_completed {
                info!(topic_id = %topic_id, best = %updated.best_score(), "topic completed");
            }
            self.clear_active_topic().await?;
        }
        Ok(updated)
    }

    /// The topic currently in progress.
    ///
    /// A pointer to an already completed topic is stale and is cleared on read.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the repository cannot be read or written.
    pub async fn active_topic(&self) -> Result<Option<TopicId>, ProgressServiceError> {
        let Some(active) = self.raw_active_topic().await? else {
            return Ok(None);
        };
        if self.get_all().await?.is_completed(&active) {
            debug!(topic_id = %active, "clearing stale active topic");
            self.clear_active_topic().await?;
            return Ok(None);
        }
        Ok(Some(active))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the pointer cannot be saved.
    pub async fn set_active_topic(&self, topic_id: &TopicId) -> Result<(), ProgressServiceError> {
        self.repo
            .save(StorageKey::ActiveTopic, topic_id.as_str())
            .await?;
        debug!(topic_id = %topic_id, "active topic set");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the pointer cannot be removed.
    pub async fn clear_active_topic(&self) -> Result<(), ProgressServiceError> {
        self.repo.remove(StorageKey::ActiveTopic).await?;
        Ok(())
    }

    /// Whether `topic_id` may be opened given the active topic.
    ///
    /// Refused only while a different, unfinished topic is active. A stale
    /// pointer to a completed topic is cleared as part of the check.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the repository cannot be read or written.
    pub async fn can_select_topic(&self, topic_id: &TopicId) -> Result<bool, ProgressServiceError> {
        Ok(self.select_decision(topic_id).await?.is_allowed())
    }

    pub(crate) async fn select_decision(
        &self,
        topic_id: &TopicId,
    ) -> Result<SelectDecision, ProgressServiceError> {
        let active = self.raw_active_topic().await?;
        let progress = self.get_all().await?;
        let decision = unlock::select_decision(topic_id, active.as_ref(), &progress);
        if decision == SelectDecision::AllowedClearStale {
            self.clear_active_topic().await?;
        }
        Ok(decision)
    }

    /// Erase topic progress, the active topic, and final test history.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the keys cannot be removed.
    pub async fn reset(&self) -> Result<(), ProgressServiceError> {
        self.repo.clear(&StorageKey::ALL).await?;
        info!("progress reset");
        Ok(())
    }

    /// Append a final test result to the history.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if loading or saving fails.
    pub async fn record_final_test_score(&self, score: Score) -> Result<(), ProgressServiceError> {
        let mut scores = self.final_test_scores().await?;
        scores.push(score);
        let encoded = serde_json::to_string(&scores)?;
        self.repo.save(StorageKey::FinalTestScores, &encoded).await?;
        info!(score = %score, attempts = scores.len(), "final test score recorded");
        Ok(())
    }

    /// Final test results, oldest first. Corrupt data reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the repository cannot be read.
    pub async fn final_test_scores(&self) -> Result<Vec<Score>, ProgressServiceError> {
        let Some(raw) = self.repo.load(StorageKey::FinalTestScores).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Score>>(&raw) {
            Ok(scores) => Ok(scores),
            Err(err) => {
                warn!(key = %StorageKey::FinalTestScores, error = %err, "ignoring corrupt score history");
                Ok(Vec::new())
            }
        }
    }

    /// Highest final test score, or zero without attempts.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the repository cannot be read.
    pub async fn best_final_test_score(&self) -> Result<Score, ProgressServiceError> {
        Ok(self
            .final_test_scores()
            .await?
            .into_iter()
            .fold(Score::ZERO, Score::max))
    }

    async fn raw_active_topic(&self) -> Result<Option<TopicId>, ProgressServiceError> {
        let raw = self.repo.load(StorageKey::ActiveTopic).await?;
        Ok(raw.and_then(|value| value.parse::<TopicId>().ok()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
