use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable key-value records, each replaced wholesale on write.
///
/// A write must be visible to the next read through the same repository.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Fetch the raw record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_record(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn put_record(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the record under `key`. Removing a missing record is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_record(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl RecordRepository for InMemoryRepository {
    async fn get_record(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_record(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_record(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Record repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub records: Arc<dyn RecordRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let records: Arc<dyn RecordRepository> = Arc::new(InMemoryRepository::new());
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_delete_removes() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_record("k").await.unwrap(), None);

        repo.put_record("k", "first").await.unwrap();
        repo.put_record("k", "second").await.unwrap();
        assert_eq!(repo.get_record("k").await.unwrap().as_deref(), Some("second"));

        repo.delete_record("k").await.unwrap();
        repo.delete_record("k").await.unwrap();
        assert_eq!(repo.get_record("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_records() {
        let storage = Storage::in_memory();
        let other = storage.clone();
        storage.records.put_record("k", "v").await.unwrap();
        assert_eq!(
            other.records.get_record("k").await.unwrap().as_deref(),
            Some("v")
        );
    }
}
