//! `InMemoryStorageProvider`: wires the in-memory collection and index
//! wrappers together behind `km_storage::StorageProvider`. Fastest
//! backend (no I/O), data lost on drop — intended for tests and small
//! conversations that fit comfortably in memory.

use std::sync::Arc;

use async_trait::async_trait;
use km_embedding::{CachingEmbeddingClient, EmbeddingClient};
use km_storage::{
    build_snapshot, ConversationSnapshotJson, LoadedSnapshot, MessageCollection, MessageTextIndexProvider, PropertyIndexProvider,
    RelatedTermsIndexProvider, SemanticRefCollection, SnapshotInput, StorageError, StorageProvider, TermIndexProvider, ThreadIndexProvider,
    TimestampIndexProvider,
};
use tracing::info;

use crate::collection::{InMemoryMessageCollection, InMemorySemanticRefCollection};
use crate::message_text::InMemoryMessageTextIndex;
use crate::property::InMemoryPropertyIndex;
use crate::related_terms::InMemoryRelatedTermsIndex;
use crate::term::InMemoryTermIndex;
use crate::thread::InMemoryThreadIndex;
use crate::timestamp::InMemoryTimestampIndex;

pub struct InMemoryStorageProvider {
    messages: Arc<InMemoryMessageCollection>,
    semantic_refs: Arc<InMemorySemanticRefCollection>,
    term_index: Arc<InMemoryTermIndex>,
    property_index: Arc<InMemoryPropertyIndex>,
    timestamp_index: Arc<InMemoryTimestampIndex>,
    message_text_index: Arc<InMemoryMessageTextIndex>,
    related_terms_index: Arc<InMemoryRelatedTermsIndex>,
    thread_index: Arc<InMemoryThreadIndex>,
}

impl InMemoryStorageProvider {
    /// Builds an empty provider. `embedding_client` backs the three
    /// embedding-dependent indexes (message text, fuzzy related terms,
    /// threads); it is wrapped in a [`CachingEmbeddingClient`] so all
    /// three share one exact-text cache and see only unit-normalized
    /// vectors (spec.md invariant 6).
    pub fn new(embedding_client: Arc<dyn EmbeddingClient>) -> Self {
        let embedding_client: Arc<dyn EmbeddingClient> = Arc::new(CachingEmbeddingClient::new(embedding_client));
        info!("opened in-memory storage provider");
        Self {
            messages: Arc::new(InMemoryMessageCollection::new()),
            semantic_refs: Arc::new(InMemorySemanticRefCollection::new()),
            term_index: Arc::new(InMemoryTermIndex::new()),
            property_index: Arc::new(InMemoryPropertyIndex::new()),
            timestamp_index: Arc::new(InMemoryTimestampIndex::new()),
            message_text_index: Arc::new(InMemoryMessageTextIndex::new(embedding_client.clone())),
            related_terms_index: Arc::new(InMemoryRelatedTermsIndex::new(embedding_client.clone())),
            thread_index: Arc::new(InMemoryThreadIndex::new(embedding_client)),
        }
    }

    /// Builds the portable snapshot (spec.md §6) of this provider's
    /// messages, semantic refs, term postings, related-terms data and
    /// message-text embeddings. Property and timestamp data are not part
    /// of the format; they are rebuilt from `messages`/`semantic_refs`
    /// when a snapshot is loaded back in.
    pub async fn to_snapshot(&self, name_tag: &str, tags: &[String]) -> Result<(ConversationSnapshotJson, Vec<Vec<f32>>), StorageError> {
        let messages = self.messages.iter_all().await?;
        let semantic_refs = self.semantic_refs.iter_all().await?;
        let semantic_index_data = self.term_index.export_data().await;
        let (alias_data, fuzzy_term_texts, fuzzy_term_vectors) = self.related_terms_index.export_data().await;
        let (message_locations, message_vectors) = self.message_text_index.export_data().await;

        let input = SnapshotInput {
            name_tag,
            tags,
            messages: &messages,
            semantic_refs: &semantic_refs,
            semantic_index_data,
            alias_data,
            fuzzy_term_texts,
            fuzzy_term_vectors,
            message_locations,
            message_vectors,
        };
        build_snapshot(input).map_err(|e| StorageError::Backend(e.to_string()))
    }

    /// Builds a fresh provider from a loaded snapshot, returning the
    /// snapshot's `name_tag`/`tags` alongside it since those live on the
    /// conversation, not the provider.
    pub async fn from_snapshot(loaded: LoadedSnapshot, embedding_client: Arc<dyn EmbeddingClient>) -> Result<(Self, String, Vec<String>), StorageError> {
        let provider = Self::new(embedding_client);
        provider.messages.extend(loaded.messages).await?;
        provider.semantic_refs.extend(loaded.semantic_refs).await?;
        provider.term_index.import_data(loaded.semantic_index_data).await;
        provider.related_terms_index.import_data(loaded.alias_data, loaded.fuzzy_term_texts, loaded.fuzzy_term_vectors).await?;
        provider.message_text_index.import_data(loaded.message_locations, loaded.message_vectors).await;
        Ok((provider, loaded.name_tag, loaded.tags))
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    fn get_message_collection(&self) -> Arc<dyn MessageCollection> {
        self.messages.clone()
    }

    fn get_semantic_ref_collection(&self) -> Arc<dyn SemanticRefCollection> {
        self.semantic_refs.clone()
    }

    fn get_term_index(&self) -> Arc<dyn TermIndexProvider> {
        self.term_index.clone()
    }

    fn get_property_index(&self) -> Arc<dyn PropertyIndexProvider> {
        self.property_index.clone()
    }

    fn get_timestamp_index(&self) -> Arc<dyn TimestampIndexProvider> {
        self.timestamp_index.clone()
    }

    fn get_message_text_index(&self) -> Arc<dyn MessageTextIndexProvider> {
        self.message_text_index.clone()
    }

    fn get_related_terms_index(&self) -> Arc<dyn RelatedTermsIndexProvider> {
        self.related_terms_index.clone()
    }

    fn get_thread_index(&self) -> Arc<dyn ThreadIndexProvider> {
        self.thread_index.clone()
    }

    /// Nothing to flush; dropping the provider drops its state. Present
    /// for parity with `km-storage-sqlite`, where `close` releases the
    /// connection pool.
    async fn close(&self) -> Result<(), StorageError> {
        info!("closed in-memory storage provider");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_core::Message;
    use km_embedding::DeterministicTestEmbeddingClient;

    fn provider() -> InMemoryStorageProvider {
        InMemoryStorageProvider::new(Arc::new(DeterministicTestEmbeddingClient::default()))
    }

    #[tokio::test]
    async fn factory_methods_return_the_same_instance() {
        let provider = provider();
        provider.get_message_collection().append(Message::new(vec!["hi".to_string()]).unwrap()).await.unwrap();
        assert_eq!(provider.get_message_collection().size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let provider = provider();
        provider.close().await.unwrap();
        provider.close().await.unwrap();
    }
}
