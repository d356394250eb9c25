//! Error types for sweeping.

use revsweep_document::StoreError;
use revsweep_revision::RevisionParseError;
use thiserror::Error;

/// Errors that abort a sweep run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("Store access failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid sweep configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid stored revision: {0}")]
    Revision(#[from] RevisionParseError),
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
