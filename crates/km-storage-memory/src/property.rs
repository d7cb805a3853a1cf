//! `PropertyIndexProvider` over a synchronous `km_index::PropertyIndex`.

use async_trait::async_trait;
use km_core::ScoredSemanticRef;
use km_index::{PropertyIndex, PropertyName};
use km_storage::{PropertyIndexProvider, StorageError};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryPropertyIndex {
    inner: RwLock<PropertyIndex>,
}

impl InMemoryPropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PropertyIndexProvider for InMemoryPropertyIndex {
    async fn add_property(&self, name: PropertyName, value: &str, ordinal: usize) -> Result<(), StorageError> {
        self.inner.write().await.add_property(name, value, ordinal);
        Ok(())
    }

    async fn remove_property(&self, name: PropertyName, value: &str, ordinal: usize) -> Result<(), StorageError> {
        self.inner.write().await.remove_property(name, value, ordinal);
        Ok(())
    }

    async fn remove_all_for_semref(&self, ordinal: usize) -> Result<(), StorageError> {
        self.inner.write().await.remove_all_for_semref(ordinal);
        Ok(())
    }

    async fn lookup_property(&self, name: PropertyName, value: &str) -> Result<Option<Vec<ScoredSemanticRef>>, StorageError> {
        Ok(self.inner.read().await.lookup_property(name, value))
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.size())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.write().await.clear();
        Ok(())
    }
}
