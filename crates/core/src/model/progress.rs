use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ids::TopicId;
use crate::model::score::Score;

//
// ─── TOPIC PROGRESS ───────────────────────────────────────────────────────────
//

/// Best result achieved on one topic.
///
/// `completed` always equals `best_score >= 95`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    topic_id: TopicId,
    best_score: Score,
    completed: bool,
}

impl TopicProgress {
    /// Progress after the first submission for a topic.
    #[must_use]
    pub fn first(topic_id: TopicId, score: Score) -> Self {
        Self {
            topic_id,
            best_score: score,
            completed: score.is_passing(),
        }
    }

    /// Folds a new submission in. The best score never decreases.
    #[must_use]
    pub fn with_submission(self, score: Score) -> Self {
        let best_score = self.best_score.max(score);
        Self {
            topic_id: self.topic_id,
            best_score,
            completed: best_score.is_passing(),
        }
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn best_score(&self) -> Score {
        self.best_score
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Re-derives the completion flag from the best score.
    fn normalized(self) -> Self {
        let completed = self.best_score.is_passing();
        Self { completed, ..self }
    }
}

//
// ─── PROGRESS MAP ─────────────────────────────────────────────────────────────
//

/// All topic progress records, keyed by topic id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressMap(HashMap<TopicId, TopicProgress>);

impl ProgressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a map from persisted records.
    ///
    /// Keys are taken from each record's own `topic_id`, and `completed` is
    /// recomputed, so hand-edited or stale values cannot break the invariant.
    #[must_use]
    pub fn from_persisted(records: impl IntoIterator<Item = TopicProgress>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            let record = record.normalized();
            match map.remove(&record.topic_id) {
                Some(existing) => {
                    let merged = TopicProgress::with_submission(existing, record.best_score);
                    map.insert(merged.topic_id.clone(), merged);
                }
                None => {
                    map.insert(record.topic_id.clone(), record);
                }
            }
        }
        Self(map)
    }

    #[must_use]
    pub fn get(&self, topic_id: &TopicId) -> Option<&TopicProgress> {
        self.0.get(topic_id)
    }

    /// Records a submission and returns the updated entry.
    pub fn record(&mut self, topic_id: &TopicId, score: Score) -> &TopicProgress {
        let updated = match self.0.remove(topic_id) {
            Some(existing) => existing.with_submission(score),
            None => TopicProgress::first(topic_id.clone(), score),
        };
        self.0.entry(topic_id.clone()).or_insert(updated)
    }

    /// Best score for a topic, or zero if never attempted.
    #[must_use]
    pub fn best_score(&self, topic_id: &TopicId) -> Score {
        self.get(topic_id)
            .map_or(Score::ZERO, TopicProgress::best_score)
    }

    #[must_use]
    pub fn is_completed(&self, topic_id: &TopicId) -> bool {
        self.get(topic_id).is_some_and(TopicProgress::is_completed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicProgress> {
        self.0.values()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
