//! Append-only ordered collections: the storage-level view of a
//! conversation's messages and semantic refs, shared by both backends.

use async_trait::async_trait;
use km_core::{Message, SemanticRef};

use crate::error::StorageError;

/// An append-only, ordinal-indexed collection of messages.
#[async_trait]
pub trait MessageCollection: Send + Sync {
    /// Appends `message`, returning its assigned ordinal (the
    /// collection's size before the append).
    async fn append(&self, message: Message) -> Result<usize, StorageError>;

    /// Appends every message in `messages` in order, returning their
    /// assigned ordinals.
    async fn extend(&self, messages: Vec<Message>) -> Result<Vec<usize>, StorageError>;

    async fn size(&self) -> Result<usize, StorageError>;

    async fn get_item(&self, ordinal: usize) -> Result<Option<Message>, StorageError>;

    /// A half-open slice `[start, end)`.
    async fn get_slice(&self, start: usize, end: usize) -> Result<Vec<Message>, StorageError>;

    /// Looks up several ordinals at once, preserving their input order.
    /// An ordinal with no corresponding message yields `None` in that
    /// position rather than shortening the result.
    async fn get_multiple(&self, ordinals: &[usize]) -> Result<Vec<Option<Message>>, StorageError>;

    /// All messages in ordinal order — the async-iteration primitive
    /// spec.md §4.9 calls for, implemented here as a materialized vector
    /// since conversations in scope fit comfortably in memory.
    async fn iter_all(&self) -> Result<Vec<Message>, StorageError>;
}

/// An append-only, ordinal-indexed collection of semantic refs.
#[async_trait]
pub trait SemanticRefCollection: Send + Sync {
    async fn append(&self, semantic_ref: SemanticRef) -> Result<usize, StorageError>;

    async fn extend(&self, semantic_refs: Vec<SemanticRef>) -> Result<Vec<usize>, StorageError>;

    async fn size(&self) -> Result<usize, StorageError>;

    async fn get_item(&self, ordinal: usize) -> Result<Option<SemanticRef>, StorageError>;

    async fn get_slice(&self, start: usize, end: usize) -> Result<Vec<SemanticRef>, StorageError>;

    async fn get_multiple(&self, ordinals: &[usize]) -> Result<Vec<Option<SemanticRef>>, StorageError>;

    async fn iter_all(&self) -> Result<Vec<SemanticRef>, StorageError>;
}
