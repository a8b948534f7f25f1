use thiserror::Error;

use crate::model::ContentError;
use crate::model::ParsePreferenceError;

/// Errors raised while reading user-supplied documents and settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Preference(#[from] ParsePreferenceError),
}
