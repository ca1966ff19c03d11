//! Access rules for lessons, topics and the final test.
//!
//! Everything here is a pure function of a catalog and a progress snapshot.
//! Missing or empty input always resolves to the locked answer.

use crate::model::{Catalog, LessonId, ProgressMap, TopicId};

/// Completed/total counts for one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LessonProgress {
    pub completed: usize,
    pub total: usize,
}

/// Completion across the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverallProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Combined view of a topic for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicState {
    Locked,
    Available,
    Active,
    Completed,
}

/// Result of checking the active-topic pointer before switching topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectDecision {
    /// Nothing blocks the selection.
    Allowed,
    /// Allowed, but the stored pointer names a completed topic and must be cleared.
    AllowedClearStale,
    /// Another unfinished topic is in progress.
    Refused { active: TopicId },
}

impl SelectDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, SelectDecision::Refused { .. })
    }
}

/// A topic is unlocked when every topic before it in global order is completed.
///
/// The first topic is always unlocked. Unknown topics and empty catalogs are locked.
#[must_use]
pub fn is_topic_unlocked(topic_id: &TopicId, catalog: &Catalog, progress: &ProgressMap) -> bool {
    if catalog.is_empty() {
        return false;
    }
    let Some(position) = catalog.position(topic_id) else {
        return false;
    };
    catalog.ordered_topics()[..position]
        .iter()
        .all(|t| progress.is_completed(&t.id))
}

/// Lessons are always open; only their topics are gated.
///
/// A lesson id that is not in the catalog is locked, like every other
/// lookup on missing input.
#[must_use]
pub fn is_lesson_unlocked(lesson_id: &LessonId, catalog: &Catalog) -> bool {
    catalog.lesson(lesson_id).is_some()
}

/// Decides whether `topic_id` may become the active topic.
#[must_use]
pub fn select_decision(
    topic_id: &TopicId,
    active: Option<&TopicId>,
    progress: &ProgressMap,
) -> SelectDecision {
    match active {
        None => SelectDecision::Allowed,
        Some(active) if progress.is_completed(active) => SelectDecision::AllowedClearStale,
        Some(active) if active == topic_id => SelectDecision::Allowed,
        Some(active) => SelectDecision::Refused {
            active: active.clone(),
        },
    }
}

#[must_use]
pub fn lesson_progress(
    lesson_id: &LessonId,
    catalog: &Catalog,
    progress: &ProgressMap,
) -> LessonProgress {
    let mut out = LessonProgress::default();
    for topic in catalog.topics_in_lesson(lesson_id) {
        out.total += 1;
        if progress.is_completed(&topic.id) {
            out.completed += 1;
        }
    }
    out
}

/// True only when the catalog is non-empty and every topic in it is completed.
#[must_use]
pub fn can_access_final_test(topic_ids: &[TopicId], progress: &ProgressMap) -> bool {
    !topic_ids.is_empty() && topic_ids.iter().all(|id| progress.is_completed(id))
}

#[must_use]
pub fn overall_progress(topic_ids: &[TopicId], progress: &ProgressMap) -> OverallProgress {
    let total = topic_ids.len();
    let completed = topic_ids
        .iter()
        .filter(|id| progress.is_completed(id))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let percentage = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    OverallProgress {
        completed,
        total,
        percentage,
    }
}

#[must_use]
pub fn topic_state(
    topic_id: &TopicId,
    catalog: &Catalog,
    progress: &ProgressMap,
    active: Option<&TopicId>,
) -> TopicState {
    if progress.is_completed(topic_id) {
        TopicState::Completed
    } else if !is_topic_unlocked(topic_id, catalog, progress) {
        TopicState::Locked
    } else if active == Some(topic_id) {
        TopicState::Active
    } else {
        TopicState::Available
    }
}
