use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::ids::{AnswerId, LessonId, QuestionId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate lesson id: {0}")]
    DuplicateLesson(LessonId),

    #[error("duplicate topic id: {0}")]
    DuplicateTopic(TopicId),

    #[error("topic {topic} refers to unknown lesson {lesson}")]
    UnknownLesson { topic: TopicId, lesson: LessonId },
}

//
// ─── ENTITIES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub lesson_id: LessonId,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

/// A question joined with its answers, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub topic_id: TopicId,
    pub text: String,
    pub image_path: Option<String>,
    pub order_index: i64,
    pub answers: Vec<Answer>,
}

impl Question {
    /// The answer flagged correct, if the data has one.
    #[must_use]
    pub fn correct_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.is_correct)
    }

    #[must_use]
    pub fn has_answer(&self, answer_id: &AnswerId) -> bool {
        self.answers.iter().any(|a| &a.id == answer_id)
    }
}

//
// ─── CATALOG ──────────────────────────────────────────────────────────────────
//

/// Full list of lessons and topics.
///
/// Topics are kept in global order: lessons by `order_index`, then topics
/// by `order_index` within each lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    lessons: Vec<Lesson>,
    topics: Vec<Topic>,
}

impl Catalog {
    /// Builds a catalog and computes the global topic order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on duplicate ids or topics whose lesson is missing.
    pub fn new(mut lessons: Vec<Lesson>, topics: Vec<Topic>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for lesson in &lessons {
            if !seen.insert(lesson.id.clone()) {
                return Err(CatalogError::DuplicateLesson(lesson.id.clone()));
            }
        }

        let mut seen_topics = HashSet::new();
        for topic in &topics {
            if !seen_topics.insert(topic.id.clone()) {
                return Err(CatalogError::DuplicateTopic(topic.id.clone()));
            }
            if !seen.contains(&topic.lesson_id) {
                return Err(CatalogError::UnknownLesson {
                    topic: topic.id.clone(),
                    lesson: topic.lesson_id.clone(),
                });
            }
        }

        // Stable sorts keep backend order for equal order_index values.
        lessons.sort_by_key(|l| l.order_index);

        let mut by_lesson: HashMap<LessonId, Vec<Topic>> = HashMap::new();
        for topic in topics {
            by_lesson.entry(topic.lesson_id.clone()).or_default().push(topic);
        }

        let mut ordered = Vec::with_capacity(seen_topics.len());
        for lesson in &lessons {
            if let Some(mut group) = by_lesson.remove(&lesson.id) {
                group.sort_by_key(|t| t.order_index);
                ordered.extend(group);
            }
        }

        Ok(Self {
            lessons,
            topics: ordered,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty() || self.topics.is_empty()
    }

    /// Lessons sorted by `order_index`.
    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    /// Topics in global order.
    #[must_use]
    pub fn ordered_topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn lesson(&self, lesson_id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| &l.id == lesson_id)
    }

    #[must_use]
    pub fn topic(&self, topic_id: &TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| &t.id == topic_id)
    }

    /// Position of a topic in the global order.
    #[must_use]
    pub fn position(&self, topic_id: &TopicId) -> Option<usize> {
        self.topics.iter().position(|t| &t.id == topic_id)
    }

    /// Topics of one lesson, ordered.
    pub fn topics_in_lesson<'a>(
        &'a self,
        lesson_id: &'a LessonId,
    ) -> impl Iterator<Item = &'a Topic> + 'a {
        self.topics.iter().filter(move |t| &t.lesson_id == lesson_id)
    }

    #[must_use]
    pub fn topic_ids(&self) -> Vec<TopicId> {
        self.topics.iter().map(|t| t.id.clone()).collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn lesson(id: &str, order: i64) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            title: format!("Lesson {id}"),
            order_index: order,
        }
    }

    pub(crate) fn topic(id: &str, lesson_id: &str, order: i64) -> Topic {
        Topic {
            id: TopicId::new(id),
            lesson_id: LessonId::new(lesson_id),
            title: format!("Topic {id}"),
            order_index: order,
        }
    }

    #[test]
    fn global_order_sorts_lessons_then_topics() {
        let catalog = Catalog::new(
            vec![lesson("L2", 2), lesson("L1", 1)],
            vec![
                topic("b2", "L2", 2),
                topic("a2", "L1", 2),
                topic("b1", "L2", 1),
                topic("a1", "L1", 1),
            ],
        )
        .unwrap();

        let ids: Vec<&str> = catalog
            .ordered_topics()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["a1", "a2", "b1", "b2"]);
        assert_eq!(catalog.lessons()[0].id, LessonId::new("L1"));
        assert_eq!(catalog.position(&TopicId::new("b1")), Some(2));
    }

    #[test]
    fn rejects_orphan_topics() {
        let err = Catalog::new(vec![lesson("L1", 1)], vec![topic("t", "L9", 1)]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownLesson { .. }));
    }

    #[test]
    fn rejects_duplicate_topics() {
        let err = Catalog::new(
            vec![lesson("L1", 1)],
            vec![topic("t", "L1", 1), topic("t", "L1", 2)],
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTopic(TopicId::new("t")));
    }

    #[test]
    fn correct_answer_lookup() {
        let q = Question {
            id: QuestionId::new("q"),
            topic_id: TopicId::new("t"),
            text: "?".into(),
            image_path: None,
            order_index: 0,
            answers: vec![
                Answer {
                    id: AnswerId::new("a"),
                    question_id: QuestionId::new("q"),
                    text: "no".into(),
                    is_correct: false,
                },
                Answer {
                    id: AnswerId::new("b"),
                    question_id: QuestionId::new("q"),
                    text: "yes".into(),
                    is_correct: true,
                },
            ],
        };
        assert_eq!(q.correct_answer().map(|a| a.id.as_str()), Some("b"));
        assert!(q.has_answer(&AnswerId::new("a")));
        assert!(!q.has_answer(&AnswerId::new("z")));
    }
}
