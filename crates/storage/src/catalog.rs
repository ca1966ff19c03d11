//! Catalog boundary: backend rows in, strict domain entities out.
//!
//! Rows keep the backend's field names so exports can be loaded as-is.
//! Nothing past `map_rows` sees a loosely typed value.

use async_trait::async_trait;
use quiz_core::model::{
    Answer, AnswerId, Catalog, Lesson, LessonId, Question, QuestionId, Topic, TopicId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::repository::StorageError;

//
// ─── ROWS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRow {
    pub id: String,
    pub lesson_id: String,
    #[serde(alias = "title")]
    pub title_uz_cyr: String,
    #[serde(default)]
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRow {
    pub id: String,
    pub topic_id: String,
    #[serde(alias = "text")]
    pub question_uz_cyr: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub order_index: i64,
    /// Some endpoints inline answers, either as an array or as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<EmbeddedAnswers>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRow {
    pub id: String,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(alias = "text")]
    pub answer_uz_cyr: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedAnswers {
    List(Vec<AnswerRow>),
    Encoded(String),
}

/// Everything the catalog provider returns in one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRows {
    #[serde(default)]
    pub lessons: Vec<LessonRow>,
    #[serde(default)]
    pub topics: Vec<TopicRow>,
    #[serde(default)]
    pub questions: Vec<QuestionRow>,
    #[serde(default)]
    pub answers: Vec<AnswerRow>,
}

//
// ─── SNAPSHOT ─────────────────────────────────────────────────────────────────
//

/// Lessons, topics and the joined question pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    catalog: Catalog,
    questions: Vec<Question>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new(catalog: Catalog, mut questions: Vec<Question>) -> Self {
        questions.sort_by_key(|q| q.order_index);
        Self { catalog, questions }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Every question with its answers, ordered by `order_index`.
    #[must_use]
    pub fn all_questions(&self) -> &[Question] {
        &self.questions
    }

    /// Questions of one topic in presentation order.
    #[must_use]
    pub fn questions_for_topic(&self, topic_id: &TopicId) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| &q.topic_id == topic_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn question_count(&self, topic_id: &TopicId) -> usize {
        self.questions
            .iter()
            .filter(|q| &q.topic_id == topic_id)
            .count()
    }
}

//
// ─── MAPPING ──────────────────────────────────────────────────────────────────
//

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn parse_id<T: FromStr>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    raw.parse::<T>()
        .map_err(|_| StorageError::Serialization(format!("empty {field}")))
}

fn map_answer(row: AnswerRow, question_id: QuestionId) -> Result<Answer, StorageError> {
    Ok(Answer {
        id: parse_id::<AnswerId>("answer id", &row.id)?,
        question_id,
        text: row.answer_uz_cyr,
        is_correct: row.is_correct,
    })
}

fn embedded_rows(embedded: EmbeddedAnswers) -> Result<Vec<AnswerRow>, StorageError> {
    match embedded {
        EmbeddedAnswers::List(rows) => Ok(rows),
        EmbeddedAnswers::Encoded(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        EmbeddedAnswers::Encoded(raw) => serde_json::from_str(&raw).map_err(ser),
    }
}

/// Maps backend rows into a validated snapshot.
///
/// Questions whose topic is unknown and answers whose question is unknown are
/// dropped and logged. A question's answers come from exactly one source:
/// embedded answers when the row has any, the separate answer list otherwise.
/// Duplicate ids and orphan topics are errors.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for empty ids, undecodable embedded
/// answers, or an inconsistent lesson/topic structure.
pub fn map_rows(rows: CatalogRows) -> Result<CatalogSnapshot, StorageError> {
    let lessons = rows
        .lessons
        .into_iter()
        .map(|row| {
            Ok(Lesson {
                id: parse_id::<LessonId>("lesson id", &row.id)?,
                title: row.title,
                order_index: row.order_index,
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

    let topics = rows
        .topics
        .into_iter()
        .map(|row| {
            Ok(Topic {
                id: parse_id::<TopicId>("topic id", &row.id)?,
                lesson_id: parse_id::<LessonId>("lesson id", &row.lesson_id)?,
                title: row.title_uz_cyr,
                order_index: row.order_index,
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

    let catalog = Catalog::new(lessons, topics).map_err(ser)?;
    let known_topics: HashSet<TopicId> = catalog.topic_ids().into_iter().collect();

    let mut answers_by_question: HashMap<QuestionId, Vec<Answer>> = HashMap::new();
    for row in rows.answers {
        let Some(raw_qid) = row.question_id.clone() else {
            warn!(answer_id = %row.id, "dropping answer without question_id");
            continue;
        };
        let qid = parse_id::<QuestionId>("question id", &raw_qid)?;
        let answer = map_answer(row, qid.clone())?;
        answers_by_question.entry(qid).or_default().push(answer);
    }

    let mut questions = Vec::with_capacity(rows.questions.len());
    let mut seen_questions = HashSet::new();
    let mut seen_answers: HashSet<AnswerId> = HashSet::new();
    for row in rows.questions {
        let id = parse_id::<QuestionId>("question id", &row.id)?;
        let topic_id = parse_id::<TopicId>("topic id", &row.topic_id)?;
        if !known_topics.contains(&topic_id) {
            warn!(question_id = %id, topic_id = %topic_id, "dropping question for unknown topic");
            continue;
        }
        if !seen_questions.insert(id.clone()) {
            return Err(StorageError::Serialization(format!(
                "duplicate question id: {id}"
            )));
        }

        let listed = answers_by_question.remove(&id).unwrap_or_default();
        let embedded = match row.answers {
            Some(embedded) => embedded_rows(embedded)?
                .into_iter()
                .map(|answer_row| map_answer(answer_row, id.clone()))
                .collect::<Result<Vec<_>, StorageError>>()?,
            None => Vec::new(),
        };
        // Embedded answers win; the two sources are never merged.
        let answers = if embedded.is_empty() {
            listed
        } else {
            if !listed.is_empty() {
                warn!(
                    question_id = %id,
                    dropped = listed.len(),
                    "question has embedded answers; ignoring listed ones"
                );
            }
            embedded
        };
        for answer in &answers {
            if !seen_answers.insert(answer.id.clone()) {
                return Err(StorageError::Serialization(format!(
                    "duplicate answer id: {}",
                    answer.id
                )));
            }
        }

        questions.push(Question {
            id,
            topic_id,
            text: row.question_uz_cyr,
            image_path: row.image_path.filter(|p| !p.trim().is_empty()),
            order_index: row.order_index,
            answers,
        });
    }

    for (orphan, answers) in &answers_by_question {
        warn!(question_id = %orphan, count = answers.len(), "dropping answers for unknown question");
    }

    debug!(
        lessons = catalog.lessons().len(),
        topics = catalog.ordered_topics().len(),
        questions = questions.len(),
        "catalog mapped"
    );
    Ok(CatalogSnapshot::new(catalog, questions))
}

//
// ─── SOURCES ──────────────────────────────────────────────────────────────────
//

/// Provider of the full catalog snapshot.
///
/// A load resolves once with everything or fails once; callers do not retry.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Load and map the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the source cannot be read or mapped.
    async fn load(&self) -> Result<CatalogSnapshot, StorageError>;
}

/// Reads a JSON export of backend rows from disk.
#[derive(Debug, Clone)]
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for JsonCatalogSource {
    async fn load(&self) -> Result<CatalogSnapshot, StorageError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::NotFound,
                _ => StorageError::Connection(format!("{}: {e}", self.path.display())),
            })?;
        let rows: CatalogRows = serde_json::from_str(&raw).map_err(ser)?;
        map_rows(rows)
    }
}

/// Fixed rows held in memory, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogSource {
    rows: CatalogRows,
}

impl InMemoryCatalogSource {
    #[must_use]
    pub fn new(rows: CatalogRows) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn load(&self) -> Result<CatalogSnapshot, StorageError> {
        map_rows(self.rows.clone())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> CatalogRows {
        serde_json::from_value(serde_json::json!({
            "lessons": [
                { "id": "L2", "title": "Signs", "order_index": 2 },
                { "id": "L1", "title": "Junctions", "order_index": 1 }
            ],
            "topics": [
                { "id": "T2", "lesson_id": "L1", "title_uz_cyr": "Second", "order_index": 2, "youtube_url": null },
                { "id": "T1", "lesson_id": "L1", "title_uz_cyr": "First", "order_index": 1 },
                { "id": "T3", "lesson_id": "L2", "title": "Third", "order_index": 1 }
            ],
            "questions": [
                { "id": "q2", "topic_id": "T1", "question_uz_cyr": "B?", "image_path": "", "order_index": 2 },
                { "id": "q1", "topic_id": "T1", "question_uz_cyr": "A?", "image_path": "a.png", "order_index": 1 },
                { "id": "q3", "topic_id": "T3", "question_uz_cyr": "C?", "order_index": 1,
                  "answers": "[{\"id\":\"c1\",\"answer_uz_cyr\":\"yes\",\"is_correct\":true}]" },
                { "id": "qx", "topic_id": "gone", "question_uz_cyr": "?", "order_index": 1 }
            ],
            "answers": [
                { "id": "a1", "question_id": "q1", "answer_uz_cyr": "right", "is_correct": true },
                { "id": "a2", "question_id": "q1", "answer_uz_cyr": "wrong", "is_correct": false },
                { "id": "b1", "question_id": "q2", "answer_uz_cyr": "right", "is_correct": true },
                { "id": "z1", "question_id": "nowhere", "answer_uz_cyr": "?", "is_correct": true }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn maps_and_joins_rows() {
        let snapshot = map_rows(rows()).unwrap();
        let topics: Vec<&str> = snapshot
            .catalog()
            .ordered_topics()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(topics, ["T1", "T2", "T3"]);
        assert_eq!(snapshot.catalog().ordered_topics()[2].title, "Third");

        let t1 = snapshot.questions_for_topic(&TopicId::new("T1"));
        assert_eq!(t1.len(), 2);
        assert_eq!(t1[0].id, QuestionId::new("q1"));
        assert_eq!(t1[0].answers.len(), 2);
        assert_eq!(t1[0].image_path.as_deref(), Some("a.png"));
        assert_eq!(t1[1].image_path, None);
        assert_eq!(snapshot.question_count(&TopicId::new("T2")), 0);
    }

    #[test]
    fn decodes_embedded_answer_strings() {
        let snapshot = map_rows(rows()).unwrap();
        let t3 = snapshot.questions_for_topic(&TopicId::new("T3"));
        assert_eq!(t3[0].correct_answer().map(|a| a.id.as_str()), Some("c1"));
        assert_eq!(t3[0].answers[0].question_id, QuestionId::new("q3"));
    }

    #[test]
    fn drops_questions_of_unknown_topics() {
        let snapshot = map_rows(rows()).unwrap();
        assert_eq!(snapshot.all_questions().len(), 3);
        assert!(
            snapshot
                .all_questions()
                .iter()
                .all(|q| q.id != QuestionId::new("qx"))
        );
    }

    #[test]
    fn embedded_answers_replace_listed_ones() {
        let mut both = rows();
        both.questions[1].answers = Some(EmbeddedAnswers::List(vec![
            AnswerRow {
                id: "a1".into(),
                question_id: None,
                answer_uz_cyr: "right".into(),
                is_correct: true,
            },
            AnswerRow {
                id: "a2".into(),
                question_id: None,
                answer_uz_cyr: "wrong".into(),
                is_correct: false,
            },
        ]));
        let snapshot = map_rows(both).unwrap();
        let q1 = &snapshot.questions_for_topic(&TopicId::new("T1"))[0];
        let ids: Vec<&str> = q1.answers.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a1", "a2"]);
    }

    #[test]
    fn empty_embedded_list_falls_back_to_listed_answers() {
        let mut rows = rows();
        rows.questions[1].answers = Some(EmbeddedAnswers::Encoded(String::new()));
        let snapshot = map_rows(rows).unwrap();
        assert_eq!(snapshot.questions_for_topic(&TopicId::new("T1"))[0].answers.len(), 2);
    }

    #[test]
    fn duplicate_answer_id_is_an_error() {
        let mut dup = rows();
        dup.answers[1].id = "a1".into();
        assert!(matches!(map_rows(dup), Err(StorageError::Serialization(msg)) if msg.contains("a1")));

        let mut across = rows();
        across.answers[2].id = "a1".into();
        assert!(matches!(map_rows(across), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn orphan_topic_is_an_error() {
        let mut bad = rows();
        bad.topics[0].lesson_id = "L404".into();
        assert!(matches!(map_rows(bad), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn empty_id_is_an_error() {
        let mut bad = rows();
        bad.answers[0].id = String::new();
        assert!(matches!(map_rows(bad), Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn in_memory_source_loads() {
        let source = InMemoryCatalogSource::new(rows());
        let snapshot = source.load().await.unwrap();
        assert_eq!(snapshot.catalog().lessons()[0].id, LessonId::new("L1"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let source = JsonCatalogSource::new("/definitely/not/here/catalog.json");
        assert!(matches!(source.load().await, Err(StorageError::NotFound)));
    }
}
