//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core domain expects from infrastructure.
//! They contain no implementation details (no `sqlx` types, no HTTP client
//! types) and use only domain types.

mod asr;
mod llm_provider;
mod object_store;
mod repositories;

pub use asr::{AsrError, AsrPort};
pub use llm_provider::{LlmError, LlmProviderPort};
pub use object_store::{ObjectStoreError, ObjectStorePort};
pub use repositories::{
    DeviceBindingRepository, NotificationLogRepository, PodcastRepository,
    PurchaseEventRepository, PurchaseRecordRepository, TransactionLogRepository, UserRepository,
};

use thiserror::Error;

/// Domain-specific errors for repository operations. Abstracts away storage
/// implementation details (sqlx errors) so services can handle storage
/// failures without depending on the database crate.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Canonical error type for semantic domain errors (spec.md §7's taxonomy,
/// realized as a type). Adapters map this to their own error shapes (HTTP
/// status codes, retry decisions).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Rate limited")]
    RateLimited,

    /// Provider-signalled usage exhaustion. Not retried; propagates up
    /// through ingestion and stops the batch cleanly (spec.md §4.1, §7).
    #[error("Quota exceeded")]
    QuotaExceeded,

    /// An out-of-order notification whose `expireDateMs` would regress
    /// protected state. Idempotency row is still recorded; no mutation.
    #[error("Stale state transition: {0}")]
    Stale(String),

    /// A notification with a previously seen `notificationUUID`.
    #[error("Duplicate notification")]
    Duplicate,

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
