//! The storage-provider abstraction: one type that owns a conversation's
//! collections and all six indexes, with factory methods that always
//! hand back the same instance for the provider's lifetime.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collection::{MessageCollection, SemanticRefCollection};
use crate::error::StorageError;
use crate::indexes::{
    MessageTextIndexProvider, PropertyIndexProvider, RelatedTermsIndexProvider, TermIndexProvider, ThreadIndexProvider, TimestampIndexProvider,
};

/// Either storage backend (`km-storage-memory` or `km-storage-sqlite`)
/// implements this trait, letting `km-pipeline` and `km-conversation` be
/// generic over which one they're using.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn get_message_collection(&self) -> Arc<dyn MessageCollection>;
    fn get_semantic_ref_collection(&self) -> Arc<dyn SemanticRefCollection>;
    fn get_term_index(&self) -> Arc<dyn TermIndexProvider>;
    fn get_property_index(&self) -> Arc<dyn PropertyIndexProvider>;
    fn get_timestamp_index(&self) -> Arc<dyn TimestampIndexProvider>;
    fn get_message_text_index(&self) -> Arc<dyn MessageTextIndexProvider>;
    fn get_related_terms_index(&self) -> Arc<dyn RelatedTermsIndexProvider>;
    fn get_thread_index(&self) -> Arc<dyn ThreadIndexProvider>;

    /// Flushes and releases all resources. Idempotent — calling `close`
    /// on an already-closed provider is a no-op, not an error.
    async fn close(&self) -> Result<(), StorageError>;
}
