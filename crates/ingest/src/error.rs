//! Ingestion-local error taxonomy, converted to [`CoreError`] at the
//! orchestrator boundary (`SPEC_FULL.md` §6.2).

use bilingo_core::{AsrError, CoreError, ObjectStoreError, RepositoryError};
use thiserror::Error;
use translate::TranslateError;

use crate::feed::FeedError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transient error: {0}")]
    Transient(String),
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IngestError> for CoreError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Transient(msg) => Self::Transient(msg),
            IngestError::QuotaExceeded => Self::QuotaExceeded,
            IngestError::Repository(e) => Self::Repository(e),
            IngestError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<AsrError> for IngestError {
    fn from(err: AsrError) -> Self {
        match err {
            AsrError::Transient(msg) => Self::Transient(msg),
            AsrError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<ObjectStoreError> for IngestError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::Transient(msg) => Self::Transient(msg),
            ObjectStoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<TranslateError> for IngestError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::QuotaExceeded => Self::QuotaExceeded,
        }
    }
}

impl From<FeedError> for IngestError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Transient(msg) => Self::Transient(msg),
            FeedError::Internal(msg) => Self::Internal(msg),
        }
    }
}
