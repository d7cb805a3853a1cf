//! Errors raised by embedding clients.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("embedding response had no vector for input")]
    EmptyResponse,

    #[error("embedding batch response count mismatch: expected {expected}, got {got}")]
    BatchCountMismatch { expected: usize, got: usize },
}
