use bilingo_core::CoreError;
use thiserror::Error;

use crate::jws::JwsError;

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("invalid receipt: {0}")]
    InvalidReceipt(#[from] JwsError),
    #[error("validation: {0}")]
    Validation(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}
