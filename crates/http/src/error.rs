//! HTTP error mapping (`SPEC_FULL.md` §6.2). Grounded on
//! `gglib-axum/src/error.rs`'s `HttpError` + `IntoResponse` pattern, with
//! the status table replaced by spec.md §7's taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bilingo_core::CoreError;
use entitlement::EntitlementError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient upstream error: {0}")]
    Transient(String),

    #[error("rate limited")]
    RateLimited,

    #[error("quota exceeded")]
    QuotaExceeded,

    /// Stale/duplicate operations succeed with `200` and a body flag
    /// rather than an error status (spec.md §7); this variant only
    /// exists so a handler can short-circuit through `?` when it wants
    /// the default body, and is rendered identically to a 200 elsewhere.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, retryable) = match &self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, None),
            Self::Auth(_) => (StatusCode::UNAUTHORIZED, None),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, None),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, None),
            Self::Transient(_) | Self::RateLimited => (StatusCode::SERVICE_UNAVAILABLE, Some(true)),
            Self::QuotaExceeded => (StatusCode::SERVICE_UNAVAILABLE, Some(false)),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let body = ErrorBody { success: false, error: self.to_string(), retryable };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => match repo_err {
                bilingo_core::RepositoryError::NotFound(msg) => Self::NotFound(msg),
                bilingo_core::RepositoryError::AlreadyExists(msg)
                | bilingo_core::RepositoryError::Constraint(msg) => Self::Validation(msg),
                bilingo_core::RepositoryError::Storage(msg)
                | bilingo_core::RepositoryError::Serialization(msg) => Self::Internal(msg),
            },
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Auth(msg) => Self::Auth(msg),
            CoreError::Transient(msg) | CoreError::ExternalService(msg) => Self::Transient(msg),
            CoreError::RateLimited => Self::RateLimited,
            CoreError::QuotaExceeded => Self::QuotaExceeded,
            CoreError::Stale(_) | CoreError::Duplicate => {
                Self::Internal("unreachable: handled as 200 responses by the caller".into())
            }
            CoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<EntitlementError> for HttpError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::InvalidReceipt(e) => Self::Validation(e.to_string()),
            EntitlementError::Validation(msg) => Self::Validation(msg),
            EntitlementError::Core(core_err) => core_err.into(),
        }
    }
}

impl From<ingest::IngestError> for HttpError {
    fn from(err: ingest::IngestError) -> Self {
        CoreError::from(err).into()
    }
}

/// Standard success envelope used by the info/catalogue routes:
/// `{success: true, ...}` (spec.md §6).
pub fn ok_envelope(fields: serde_json::Value) -> axum::Json<serde_json::Value> {
    let mut body = json!({ "success": true });
    if let Some(map) = body.as_object_mut() {
        if let Some(extra) = fields.as_object() {
            map.extend(extra.clone());
        }
    }
    axum::Json(body)
}
