//! `MessageTextIndexProvider` over a synchronous `km_index::MessageTextIndex`.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::{Message, ScoredMessage};
use km_embedding::EmbeddingClient;
use km_index::{MessageTextIndex, MessageTextIndexData};
use km_storage::{MessageTextIndexProvider, StorageError};
use tokio::sync::RwLock;

pub struct InMemoryMessageTextIndex {
    inner: RwLock<MessageTextIndex>,
    client: Arc<dyn EmbeddingClient>,
}

impl InMemoryMessageTextIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { inner: RwLock::new(MessageTextIndex::new(client.clone())), client }
    }

    /// Every chunk location and its embedding vector, for snapshotting.
    pub async fn export_data(&self) -> (MessageTextIndexData, Vec<Vec<f32>>) {
        self.inner.read().await.serialize()
    }

    /// Replaces this index's entries with `locations`/`vectors`, for
    /// loading a snapshot into a freshly created provider.
    pub async fn import_data(&self, locations: MessageTextIndexData, vectors: Vec<Vec<f32>>) {
        *self.inner.write().await = MessageTextIndex::deserialize(self.client.clone(), locations, vectors);
    }
}

#[async_trait]
impl MessageTextIndexProvider for InMemoryMessageTextIndex {
    async fn add_messages_starting_at(&self, start_ordinal: usize, messages: &[Message]) -> Result<(), StorageError> {
        self.inner.write().await.add_messages_starting_at(start_ordinal, messages).await.map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn lookup_messages(&self, text: &str, max_matches: usize, threshold: f64) -> Result<Vec<ScoredMessage>, StorageError> {
        self.inner.read().await.lookup_messages(text, max_matches, threshold).await.map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn lookup_messages_in_subset(
        &self,
        text: &str,
        subset: &[usize],
        max_matches: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredMessage>, StorageError> {
        self.inner
            .read()
            .await
            .lookup_messages_in_subset(text, subset, max_matches, threshold)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.size())
    }

    async fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.inner.read().await.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_embedding::DeterministicTestEmbeddingClient;

    fn client() -> Arc<dyn EmbeddingClient> {
        Arc::new(DeterministicTestEmbeddingClient::default())
    }

    #[tokio::test]
    async fn empty_index_reports_empty() {
        let index = InMemoryMessageTextIndex::new(client());
        assert!(index.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn add_then_lookup_finds_matching_message() {
        let index = InMemoryMessageTextIndex::new(client());
        let messages = vec![Message::new(vec!["hello world".to_string()]).unwrap()];
        index.add_messages_starting_at(0, &messages).await.unwrap();
        let hits = index.lookup_messages("hello world", 5, 0.0).await.unwrap();
        assert_eq!(hits[0].message_ordinal, 0);
    }
}
