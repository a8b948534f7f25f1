#![forbid(unsafe_code)]

pub mod records;
pub mod repository;
pub mod sqlite;

pub use records::{RESULTS_KEY, SESSION_KEY};
pub use repository::{InMemoryRepository, RecordRepository, Storage, StorageError};
