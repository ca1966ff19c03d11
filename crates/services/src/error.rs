//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizError, TopicId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("failed to encode progress: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("unknown topic: {0}")]
    UnknownTopic(TopicId),
    #[error("topic {0} is locked until earlier topics are passed")]
    TopicLocked(TopicId),
    #[error("topic {active} is still in progress")]
    TopicBusy { active: TopicId },
    #[error("final test is locked: {completed}/{total} topics completed")]
    FinalTestLocked { completed: usize, total: usize },
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
