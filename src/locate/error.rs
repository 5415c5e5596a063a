//! Error types for local reference resolution.

use thiserror::Error;

use crate::learn::LearnError;
use crate::store::{Publication, StoreError};

/// Errors from [`super::Locator`].
#[derive(Debug, Error)]
pub enum LocateError {
    /// Nothing in the local store matches and autolearning was not allowed.
    #[error("no publications matched \"{text}\"")]
    NotFound { text: String },

    /// More than one publication matches; the caller has to disambiguate.
    #[error("more than one publication matched \"{text}\"")]
    Ambiguous {
        text: String,
        candidates: Vec<Publication>,
    },

    /// The year half of a `surname.year` reference is out of range.
    #[error("invalid year in reference \"{text}\"")]
    InvalidYear { text: String },

    /// Writing a candidate listing failed.
    #[error("failed to write listing: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Learn(#[from] LearnError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LocateError {
    /// Candidates of an [`LocateError::Ambiguous`] error; empty otherwise.
    #[must_use]
    pub fn candidates(&self) -> &[Publication] {
        match self {
            Self::Ambiguous { candidates, .. } => candidates,
            _ => &[],
        }
    }
}
