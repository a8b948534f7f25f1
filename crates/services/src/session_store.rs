use std::sync::Arc;

use reader_core::model::{ResultAttempt, SessionState};
use storage::records::{decode_results, decode_session, encode_results, encode_session};
use storage::repository::{InMemoryRepository, RecordRepository};
use storage::{RESULTS_KEY, SESSION_KEY};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Persistence contract for the current session and the result history.
///
/// Stored documents that cannot be decoded are treated as absent. Only
/// backend failures are reported as errors.
#[derive(Clone)]
pub struct SessionStore {
    records: Arc<dyn RecordRepository>,
}

impl SessionStore {
    #[must_use]
    pub fn new(records: Arc<dyn RecordRepository>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Load the stored session, if there is a readable one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the backend cannot be read.
    pub async fn get(&self) -> Result<Option<SessionState>, StoreError> {
        let Some(raw) = self.records.get_record(SESSION_KEY).await? else {
            return Ok(None);
        };

        match decode_session(&raw) {
            Ok(draft) => Ok(Some(draft.normalize())),
            Err(err) => {
                warn!(error = %err, key = SESSION_KEY, "stored session is unreadable; treating as absent");
                Ok(None)
            }
        }
    }

    /// Overwrite the stored session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if encoding or the write fails.
    pub async fn put(&self, state: &SessionState) -> Result<(), StoreError> {
        let raw = encode_session(state)?;
        self.records.put_record(SESSION_KEY, &raw).await?;
        Ok(())
    }

    /// The stored session merged over defaults, or full defaults when nothing
    /// usable is stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the backend cannot be read.
    pub async fn rehydrate(&self) -> Result<SessionState, StoreError> {
        Ok(self.get().await?.unwrap_or_default())
    }

    /// Delete the stored session; the next `rehydrate` yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the backend cannot be written.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.records.delete_record(SESSION_KEY).await?;
        debug!("session record deleted");
        Ok(())
    }

    /// One read-modify-write round trip: rehydrate, transform, persist.
    ///
    /// There is no locking; two writers racing on the same store lose one
    /// update (last write wins).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the read or the write fails.
    pub async fn update<F>(&self, transition: F) -> Result<SessionState, StoreError>
    where
        F: FnOnce(&SessionState) -> SessionState + Send,
    {
        let current = self.rehydrate().await?;
        let next = transition(&current);
        self.put(&next).await?;
        Ok(next)
    }

    /// Result history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the backend cannot be read.
    pub async fn list_results(&self) -> Result<Vec<ResultAttempt>, StoreError> {
        let Some(raw) = self.records.get_record(RESULTS_KEY).await? else {
            return Ok(Vec::new());
        };

        match decode_results(&raw) {
            Ok(results) => Ok(results),
            Err(err) => {
                warn!(error = %err, key = RESULTS_KEY, "stored results are unreadable; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Prepend an attempt to the history and return the updated list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the read or the write fails.
    pub async fn append_result(
        &self,
        attempt: ResultAttempt,
    ) -> Result<Vec<ResultAttempt>, StoreError> {
        let mut results = self.list_results().await?;
        results.insert(0, attempt);
        let raw = encode_results(&results)?;
        self.records.put_record(RESULTS_KEY, &raw).await?;
        Ok(results)
    }

    /// Remove the whole result history.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the backend cannot be written.
    pub async fn clear_results(&self) -> Result<(), StoreError> {
        self.records.delete_record(RESULTS_KEY).await?;
        Ok(())
    }
}
