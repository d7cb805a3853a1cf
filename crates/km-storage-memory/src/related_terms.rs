//! `RelatedTermsIndexProvider` over a synchronous `km_index::RelatedTermsIndex`.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::Term;
use km_embedding::EmbeddingClient;
use km_index::{AliasData, AliasesIndex, FuzzyIndex, RelatedTermsIndex};
use km_storage::{RelatedTermsIndexProvider, StorageError};
use tokio::sync::RwLock;

pub struct InMemoryRelatedTermsIndex {
    inner: RwLock<RelatedTermsIndex>,
    client: Arc<dyn EmbeddingClient>,
}

impl InMemoryRelatedTermsIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { inner: RwLock::new(RelatedTermsIndex::new(client.clone())), client }
    }

    /// The authored aliases plus the fuzzy index's term texts and their
    /// embedding vectors, for snapshotting.
    pub async fn export_data(&self) -> (AliasData, Vec<String>, Vec<Vec<f32>>) {
        let inner = self.inner.read().await;
        let (texts, vectors) = inner.fuzzy.serialize();
        (inner.aliases.serialize(), texts, vectors)
    }

    /// Replaces this index's aliases and fuzzy entries with the given
    /// data, for loading a snapshot into a freshly created provider.
    pub async fn import_data(&self, alias_data: AliasData, fuzzy_texts: Vec<String>, fuzzy_vectors: Vec<Vec<f32>>) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.aliases = AliasesIndex::deserialize(alias_data);
        inner.fuzzy = FuzzyIndex::deserialize(self.client.clone(), fuzzy_texts, fuzzy_vectors).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RelatedTermsIndexProvider for InMemoryRelatedTermsIndex {
    async fn add_related_term(&self, term: &str, related: Vec<Term>) -> Result<(), StorageError> {
        self.inner.write().await.aliases.add_related_term(term, related);
        Ok(())
    }

    async fn lookup_aliases(&self, term: &str) -> Result<Option<Vec<Term>>, StorageError> {
        Ok(self.inner.read().await.aliases.lookup_term(term))
    }

    async fn add_fuzzy_terms(&self, terms: &[String]) -> Result<(), StorageError> {
        self.inner.write().await.fuzzy.add_terms(terms).await.map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn lookup_related(&self, term: &str, max_hits: usize, threshold: f64) -> Result<Vec<Term>, StorageError> {
        self.inner.read().await.lookup_related(term, max_hits, threshold).await.map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn size(&self) -> Result<(usize, usize), StorageError> {
        let inner = self.inner.read().await;
        Ok((inner.aliases.size(), inner.fuzzy.size()))
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
    async fn alias_lookup_round_trips() {
        let index = InMemoryRelatedTermsIndex::new(client());
        index.add_related_term("dog", vec![Term { text: "canine".to_string(), weight: None }]).await.unwrap();
        let aliases = index.lookup_aliases("dog").await.unwrap().unwrap();
        assert_eq!(aliases[0].text, "canine");
    }

    #[tokio::test]
    async fn size_reports_both_counts() {
        let index = InMemoryRelatedTermsIndex::new(client());
        index.add_related_term("dog", vec![Term { text: "canine".to_string(), weight: None }]).await.unwrap();
        index.add_fuzzy_terms(&["puppy".to_string()]).await.unwrap();
        assert_eq!(index.size().await.unwrap(), (1, 1));
    }
}
