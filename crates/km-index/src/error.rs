//! Errors raised while rebuilding an index from its serialized form.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeserializationError {
    #[error("embedding sidecar length mismatch: expected {expected} vectors, got {got}")]
    EmbeddingSidecarLengthMismatch { expected: usize, got: usize },
}
