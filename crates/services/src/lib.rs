#![forbid(unsafe_code)]

pub mod error;
pub mod progress;
pub mod reader_service;
pub mod session_store;

pub use reader_core::Clock;

pub use error::{ReaderError, StoreError};
pub use progress::SessionProgress;
pub use reader_service::{MistakeRow, ReaderService};
pub use session_store::SessionStore;
