//! Errors raised by storage providers and the snapshot codec.

use thiserror::Error;

/// A storage backend failure: the underlying file/DB I/O broke. Fatal
/// for the operation in progress; the caller decides whether to retry or
/// re-open the provider.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("operation attempted on a closed storage provider")]
    Closed,
}

/// Raised at snapshot load time: a malformed snapshot, a missing
/// required field, or an embedding sidecar whose length doesn't match
/// the declared text-item count. Fatal — no partial conversation is
/// created.
#[derive(Error, Debug)]
pub enum DeserializationError {
    #[error("failed to parse snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding sidecar length mismatch for {what}: expected {expected} vectors, got {got}")]
    EmbeddingSidecarLengthMismatch { what: String, expected: usize, got: usize },

    #[error("unsupported snapshot file format version: {0}")]
    UnsupportedVersion(String),
}
