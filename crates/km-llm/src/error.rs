//! Errors raised by knowledge extraction clients.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    RequestFailed(String),

    #[error("extraction request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("could not parse extraction response as knowledge: {0}")]
    MalformedResponse(String),

    #[error("extracted knowledge failed validation: {0}")]
    Validation(#[from] km_core::ValidationError),
}
