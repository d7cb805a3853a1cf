//! `TermIndexProvider` over a synchronous `km_index::TermToSemanticRefIndex`.

use async_trait::async_trait;
use km_core::ScoredSemanticRef;
use km_index::{SemanticIndexData, TermToSemanticRefIndex};
use km_storage::{StorageError, TermIndexProvider};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryTermIndex {
    inner: RwLock<TermToSemanticRefIndex>,
}

impl InMemoryTermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full set of postings, for snapshotting.
    pub async fn export_data(&self) -> SemanticIndexData {
        self.inner.read().await.serialize()
    }

    /// Replaces this index's postings with `data`, for loading a snapshot
    /// into a freshly created provider.
    pub async fn import_data(&self, data: SemanticIndexData) {
        *self.inner.write().await = TermToSemanticRefIndex::deserialize(data);
    }
}

#[async_trait]
impl TermIndexProvider for InMemoryTermIndex {
    async fn add_term(&self, term: &str, ordinal: usize, score: Option<f64>) -> Result<(), StorageError> {
        self.inner.write().await.add_term(term, ordinal, score);
        Ok(())
    }

    async fn remove_term(&self, term: &str, ordinal: usize) -> Result<(), StorageError> {
        self.inner.write().await.remove_term(term, ordinal);
        Ok(())
    }

    async fn lookup_term(&self, term: &str) -> Result<Vec<ScoredSemanticRef>, StorageError> {
        Ok(self.inner.read().await.lookup_term(term))
    }

    async fn get_terms(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.inner.read().await.get_terms())
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.size())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_lookup_round_trips() {
        let index = InMemoryTermIndex::new();
        index.add_term("bach", 0, None).await.unwrap();
        let hits = index.lookup_term("Bach").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].semantic_ref_ordinal, 0);
    }

    #[tokio::test]
    async fn clear_empties_the_index() {
        let index = InMemoryTermIndex::new();
        index.add_term("bach", 0, None).await.unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.size().await.unwrap(), 0);
    }
}
