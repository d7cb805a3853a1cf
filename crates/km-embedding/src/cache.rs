//! An LRU cache from exact text to its embedding, avoiding repeat calls to
//! an embedding client for text seen before.

use indexmap::IndexMap;

/// Caches embeddings keyed by the exact input string (case-sensitive, no
/// normalization). `capacity` of `None` means unbounded.
pub struct EmbeddingCache {
    entries: IndexMap<String, Vec<f32>>,
    capacity: Option<usize>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self { entries: IndexMap::new(), capacity: None }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: IndexMap::new(), capacity: Some(capacity) }
    }

    /// Looks up `text`, refreshing its recency on hit.
    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        let value = self.entries.shift_remove(text)?;
        self.entries.insert(text.to_string(), value.clone());
        Some(value)
    }

    /// Drops `text`'s entry, if present, without affecting the rest of
    /// the cache's recency order.
    pub fn evict(&mut self, text: &str) {
        self.entries.shift_remove(text);
    }

    /// Inserts or refreshes `text`'s embedding, evicting the least
    /// recently used entry if the cache is at capacity.
    pub fn put(&mut self, text: impl Into<String>, embedding: Vec<f32>) {
        let text = text.into();
        self.entries.shift_remove(&text);
        self.entries.insert(text, embedding);
        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                self.entries.shift_remove_index(0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}
