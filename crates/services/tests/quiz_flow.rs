use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::QuizSettings;
use quiz_core::model::{AnswerId, Score, TopicId};
use quiz_core::unlock::TopicState;
use services::{
    AppServices, FinalTestSampler, ProgressService, ProgressServiceError, QuizOutcome,
};
use storage::catalog::{
    AnswerRow, CatalogRows, EmbeddedAnswers, InMemoryCatalogSource, LessonRow, QuestionRow,
    TopicRow,
};
use storage::repository::{ProgressRepository, StorageError, StorageKey};

fn course(per_topic: usize) -> CatalogRows {
    let mut rows = CatalogRows {
        lessons: vec![
            LessonRow {
                id: "L1".into(),
                title: "Basics".into(),
                order_index: 1,
            },
            LessonRow {
                id: "L2".into(),
                title: "Road signs".into(),
                order_index: 2,
            },
        ],
        ..CatalogRows::default()
    };
    for (lesson, topic, order) in [("L1", "T1", 1), ("L1", "T2", 2), ("L2", "T3", 1)] {
        rows.topics.push(TopicRow {
            id: topic.into(),
            lesson_id: lesson.into(),
            title_uz_cyr: format!("Topic {topic}"),
            order_index: order,
        });
        for n in 0..per_topic {
            let qid = format!("{topic}-{n}");
            rows.questions.push(QuestionRow {
                id: qid.clone(),
                topic_id: topic.into(),
                question_uz_cyr: format!("{topic} question {n}"),
                image_path: None,
                order_index: i64::try_from(n).unwrap(),
                answers: Some(EmbeddedAnswers::List(vec![
                    AnswerRow {
                        id: format!("{qid}-ok"),
                        question_id: None,
                        answer_uz_cyr: "yes".into(),
                        is_correct: true,
                    },
                    AnswerRow {
                        id: format!("{qid}-no"),
                        question_id: None,
                        answer_uz_cyr: "no".into(),
                        is_correct: false,
                    },
                ])),
            });
        }
    }
    rows
}

async fn services(per_topic: usize, final_size: usize) -> AppServices {
    let source = InMemoryCatalogSource::new(course(per_topic));
    let settings = QuizSettings::new(final_size, None).unwrap();
    AppServices::in_memory(&source, settings)
        .await
        .unwrap()
        .with_sampler(FinalTestSampler::with_seed(11))
}

fn score(v: f64) -> Score {
    Score::new(v).unwrap()
}

/// Answers the first `correct` questions right and the rest wrong.
async fn play(app: &AppServices, topic: Option<&str>, correct: usize) -> QuizOutcome {
    let quiz = app.quiz_loop();
    let mut session = match topic {
        Some(id) => quiz.start_topic_test(&TopicId::new(id)).await.unwrap(),
        None => quiz.start_final_test().await.unwrap(),
    };
    let mut answered = 0;
    loop {
        let qid = session.current_question().unwrap().id.clone();
        let suffix = if answered < correct { "ok" } else { "no" };
        quiz.select_answer(&mut session, AnswerId::new(format!("{qid}-{suffix}")))
            .unwrap();
        answered += 1;
        let outcome = quiz.next(&mut session).await.unwrap();
        if !matches!(outcome, QuizOutcome::Advanced { .. }) {
            return outcome;
        }
    }
}

#[tokio::test]
async fn learner_progresses_through_course() {
    let app = services(20, 40).await;
    let access = app.access();
    let progress = app.progress();

    assert!(access.is_topic_unlocked(&TopicId::new("T1")).await.unwrap());
    assert!(!access.is_topic_unlocked(&TopicId::new("T2")).await.unwrap());

    // 19/20 = 95% passes.
    let QuizOutcome::TopicFinished { score: s, .. } = play(&app, Some("T1"), 19).await else {
        panic!("expected topic result");
    };
    assert_eq!(s, score(95.0));
    assert!(access.is_topic_unlocked(&TopicId::new("T2")).await.unwrap());

    // A worse retake never lowers the best score.
    play(&app, Some("T1"), 10).await;
    assert_eq!(
        progress.get(&TopicId::new("T1")).await.unwrap().unwrap().best_score(),
        score(95.0)
    );

    // 18/20 = 90% fails and leaves T2 active.
    play(&app, Some("T2"), 18).await;
    assert_eq!(progress.active_topic().await.unwrap(), Some(TopicId::new("T2")));
    assert!(!access.is_topic_unlocked(&TopicId::new("T3")).await.unwrap());

    play(&app, Some("T2"), 20).await;
    play(&app, Some("T3"), 20).await;

    let overview = access.overview().await.unwrap();
    assert!(overview.final_test_unlocked);
    assert_eq!(overview.overall.completed, 3);
    assert!(
        overview
            .lessons
            .iter()
            .flat_map(|l| &l.topics)
            .all(|t| t.state == TopicState::Completed)
    );

    // Final test samples 40 of 60 questions; 30 right is 75%.
    let QuizOutcome::FinalTestFinished { score: s, best } = play(&app, None, 30).await else {
        panic!("expected final result");
    };
    assert_eq!(s, score(75.0));
    assert_eq!(best, score(75.0));

    progress.reset().await.unwrap();
    assert!(progress.get_all().await.unwrap().is_empty());
    assert_eq!(progress.final_test_scores().await.unwrap(), Vec::<Score>::new());
    assert!(!access.can_access_final_test().await.unwrap());
}

#[tokio::test]
async fn final_test_takes_whole_pool_when_small() {
    let app = services(3, 40).await;
    for topic in ["T1", "T2", "T3"] {
        app.progress()
            .record(&TopicId::new(topic), score(100.0))
            .await
            .unwrap();
    }
    let session = app.quiz_loop().start_final_test().await.unwrap();
    assert_eq!(session.total(), 9);
}

#[tokio::test]
async fn can_select_topic_is_idempotent() {
    let app = services(2, 40).await;
    let progress = app.progress();
    progress.set_active_topic(&TopicId::new("T1")).await.unwrap();

    for _ in 0..3 {
        assert!(!progress.can_select_topic(&TopicId::new("T2")).await.unwrap());
    }
    assert_eq!(progress.active_topic().await.unwrap(), Some(TopicId::new("T1")));
}

struct OfflineRepository;

#[async_trait]
impl ProgressRepository for OfflineRepository {
    async fn load(&self, _key: StorageKey) -> Result<Option<String>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn save(&self, _key: StorageKey, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn remove(&self, _key: StorageKey) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn storage_failures_surface_to_callers() {
    let progress = ProgressService::new(Arc::new(OfflineRepository));
    let err = progress.get_all().await.unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Storage(StorageError::Connection(_))
    ));
    assert!(progress.reset().await.is_err());
}

#[tokio::test]
async fn progress_survives_reopening_sqlite_store() {
    let url = "sqlite:file:memdb_services_reopen?mode=memory&cache=shared";
    let source = InMemoryCatalogSource::new(course(2));

    let first = AppServices::new_sqlite(url, &source, QuizSettings::default())
        .await
        .unwrap();
    first
        .progress()
        .record(&TopicId::new("T1"), score(100.0))
        .await
        .unwrap();
    first.quiz_loop().enter_topic(&TopicId::new("T2")).await.unwrap();

    // `first` stays alive so the shared in-memory database is kept open.
    let second = AppServices::new_sqlite(url, &source, QuizSettings::default())
        .await
        .unwrap();
    let progress = second.progress();
    assert!(progress.get_all().await.unwrap().is_completed(&TopicId::new("T1")));
    assert_eq!(progress.active_topic().await.unwrap(), Some(TopicId::new("T2")));
    assert!(
        second
            .access()
            .is_topic_unlocked(&TopicId::new("T2"))
            .await
            .unwrap()
    );
    drop(first);
}
