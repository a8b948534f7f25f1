//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SessionStore`.
///
/// Undecodable records are not errors; only backend failures surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

/// Errors emitted by `ReaderService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReaderError {
    #[error("no content loaded in the session")]
    NoContent,
    #[error("final test has not been submitted")]
    FinalTestNotSubmitted,
    #[error("this final test submission is already saved")]
    ResultAlreadySaved,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StorageError> for ReaderError {
    fn from(err: StorageError) -> Self {
        Self::Store(StoreError::Storage(err))
    }
}
