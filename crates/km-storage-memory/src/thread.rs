//! `ThreadIndexProvider` over a synchronous `km_index::ThreadIndex`.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::Thread;
use km_embedding::EmbeddingClient;
use km_index::{ScoredThreadIndex, ThreadIndex};
use km_storage::{StorageError, ThreadIndexProvider};
use tokio::sync::RwLock;

pub struct InMemoryThreadIndex {
    inner: RwLock<ThreadIndex>,
}

impl InMemoryThreadIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { inner: RwLock::new(ThreadIndex::new(client)) }
    }
}

#[async_trait]
impl ThreadIndexProvider for InMemoryThreadIndex {
    async fn add_thread(&self, thread: Thread) -> Result<usize, StorageError> {
        self.inner.write().await.add_thread(thread).await.map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn lookup_thread(&self, description: &str, max_matches: usize, threshold: f64) -> Result<Option<Vec<ScoredThreadIndex>>, StorageError> {
        self.inner.read().await.lookup_thread(description, max_matches, threshold).await.map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_core::TextRange;
    use km_embedding::DeterministicTestEmbeddingClient;

    fn client() -> Arc<dyn EmbeddingClient> {
        Arc::new(DeterministicTestEmbeddingClient::default())
    }

    #[tokio::test]
    async fn empty_index_returns_none() {
        let index = InMemoryThreadIndex::new(client());
        assert_eq!(index.lookup_thread("anything", 5, 0.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_then_lookup_finds_thread() {
        let index = InMemoryThreadIndex::new(client());
        index.add_thread(Thread::new("trip planning", vec![TextRange::for_message(0)])).await.unwrap();
        let hits = index.lookup_thread("trip planning", 5, 0.0).await.unwrap().unwrap();
        assert_eq!(hits[0].thread_index, 0);
    }
}
