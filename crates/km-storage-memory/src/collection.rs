//! In-memory `MessageCollection` / `SemanticRefCollection`: a plain
//! growable vector behind a lock, ordinals being the vector index.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::{Message, SemanticRef};
use km_storage::{MessageCollection, SemanticRefCollection, StorageError};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageCollection {
    items: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryMessageCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageCollection for InMemoryMessageCollection {
    async fn append(&self, message: Message) -> Result<usize, StorageError> {
        let mut items = self.items.write().await;
        let ordinal = items.len();
        items.push(message);
        debug!(ordinal, "appended message");
        Ok(ordinal)
    }

    async fn extend(&self, messages: Vec<Message>) -> Result<Vec<usize>, StorageError> {
        let mut items = self.items.write().await;
        let start = items.len();
        let ordinals: Vec<usize> = (start..start + messages.len()).collect();
        items.extend(messages);
        debug!(count = ordinals.len(), start, "appended message batch");
        Ok(ordinals)
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.items.read().await.len())
    }

    async fn get_item(&self, ordinal: usize) -> Result<Option<Message>, StorageError> {
        Ok(self.items.read().await.get(ordinal).cloned())
    }

    async fn get_slice(&self, start: usize, end: usize) -> Result<Vec<Message>, StorageError> {
        let items = self.items.read().await;
        let end = end.min(items.len());
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(items[start..end].to_vec())
    }

    async fn get_multiple(&self, ordinals: &[usize]) -> Result<Vec<Option<Message>>, StorageError> {
        let items = self.items.read().await;
        Ok(ordinals.iter().map(|&o| items.get(o).cloned()).collect())
    }

    async fn iter_all(&self) -> Result<Vec<Message>, StorageError> {
        Ok(self.items.read().await.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySemanticRefCollection {
    items: Arc<RwLock<Vec<SemanticRef>>>,
}

impl InMemorySemanticRefCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SemanticRefCollection for InMemorySemanticRefCollection {
    async fn append(&self, mut semantic_ref: SemanticRef) -> Result<usize, StorageError> {
        let mut items = self.items.write().await;
        let ordinal = items.len();
        semantic_ref.semantic_ref_ordinal = ordinal;
        items.push(semantic_ref);
        Ok(ordinal)
    }

    async fn extend(&self, mut semantic_refs: Vec<SemanticRef>) -> Result<Vec<usize>, StorageError> {
        let mut items = self.items.write().await;
        let start = items.len();
        let ordinals: Vec<usize> = (start..start + semantic_refs.len()).collect();
        for (offset, semantic_ref) in semantic_refs.iter_mut().enumerate() {
            semantic_ref.semantic_ref_ordinal = start + offset;
        }
        items.extend(semantic_refs);
        Ok(ordinals)
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.items.read().await.len())
    }

    async fn get_item(&self, ordinal: usize) -> Result<Option<SemanticRef>, StorageError> {
        Ok(self.items.read().await.get(ordinal).cloned())
    }

    async fn get_slice(&self, start: usize, end: usize) -> Result<Vec<SemanticRef>, StorageError> {
        let items = self.items.read().await;
        let end = end.min(items.len());
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(items[start..end].to_vec())
    }

    async fn get_multiple(&self, ordinals: &[usize]) -> Result<Vec<Option<SemanticRef>>, StorageError> {
        let items = self.items.read().await;
        Ok(ordinals.iter().map(|&o| items.get(o).cloned()).collect())
    }

    async fn iter_all(&self) -> Result<Vec<SemanticRef>, StorageError> {
        Ok(self.items.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> Message {
        Message::new(vec![text.to_string()]).unwrap()
    }

    #[tokio::test]
    async fn append_assigns_sequential_ordinals() {
        let collection = InMemoryMessageCollection::new();
        assert_eq!(collection.append(msg("a")).await.unwrap(), 0);
        assert_eq!(collection.append(msg("b")).await.unwrap(), 1);
        assert_eq!(collection.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn extend_returns_contiguous_ordinals_after_prior_appends() {
        let collection = InMemoryMessageCollection::new();
        collection.append(msg("a")).await.unwrap();
        let ordinals = collection.extend(vec![msg("b"), msg("c")]).await.unwrap();
        assert_eq!(ordinals, vec![1, 2]);
    }

    #[tokio::test]
    async fn get_slice_clamps_to_len() {
        let collection = InMemoryMessageCollection::new();
        collection.extend(vec![msg("a"), msg("b")]).await.unwrap();
        let slice = collection.get_slice(1, 100).await.unwrap();
        assert_eq!(slice.len(), 1);
    }

    #[tokio::test]
    async fn get_multiple_preserves_order_and_missing_as_none() {
        let collection = InMemoryMessageCollection::new();
        collection.extend(vec![msg("a"), msg("b")]).await.unwrap();
        let found = collection.get_multiple(&[1, 5, 0]).await.unwrap();
        assert_eq!(found[0].as_ref().unwrap().full_text(), "b");
        assert!(found[1].is_none());
        assert_eq!(found[2].as_ref().unwrap().full_text(), "a");
    }

    #[tokio::test]
    async fn append_overwrites_the_ordinal_carried_by_the_caller() {
        use km_core::{Knowledge, SemanticRef, Tag, TextRange};

        let collection = InMemorySemanticRefCollection::new();
        let placeholder = SemanticRef::new(0, TextRange::for_message(0), Knowledge::Tag(Tag { text: "a".to_string() }));
        collection.append(placeholder.clone()).await.unwrap();
        let real = collection.append(placeholder).await.unwrap();
        assert_eq!(real, 1);
        assert_eq!(collection.get_item(1).await.unwrap().unwrap().semantic_ref_ordinal, 1);
    }
}
