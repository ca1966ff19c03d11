use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The persisted records making up a learner's local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// JSON object of topic id to `{topicId, bestScore, completed}`.
    Progress,
    /// Raw topic id string.
    ActiveTopic,
    /// JSON array of final-test percentages, oldest first.
    FinalTestScores,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [
        StorageKey::Progress,
        StorageKey::ActiveTopic,
        StorageKey::FinalTestScores,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Progress => "progress",
            StorageKey::ActiveTopic => "active_topic",
            StorageKey::FinalTestScores => "final_test_scores",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value contract for learner progress.
///
/// Values are opaque strings; encoding belongs to the services layer.
/// Every call is write-through: once `save` returns, the value is durable
/// for this backend.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: StorageKey) -> Result<(), StorageError>;

    /// Remove several keys. Backends that support it do this atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any removal fails.
    async fn clear(&self, keys: &[StorageKey]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(*key).await?;
        }
        Ok(())
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    values: Arc<Mutex<HashMap<StorageKey, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed a raw value, bypassing any encoding. Handy for corrupt-data tests.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, key: StorageKey, value: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key, value.into());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    async fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key, value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&key);
        Ok(())
    }

    async fn clear(&self, keys: &[StorageKey]) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }
}

/// Holds the progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
