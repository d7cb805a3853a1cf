//! The embedding cache & vector base (spec.md §4.1): a bounded key→vector
//! cache in front of any `EmbeddingClient`, plus an in-memory similarity
//! index over the same keys for `fuzzy_lookup`.
//!
//! Every vector this decorator hands back is unit-normalized (spec.md
//! invariant 6), regardless of whether the wrapped client already
//! normalizes its own output — callers (`km-index`'s `FuzzyIndex`,
//! `MessageTextIndex`, `ThreadIndex`) only ever see vectors through this
//! seam once a provider wires it in, so the invariant holds crate-wide
//! without each of them re-checking it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::cache::EmbeddingCache;
use crate::client::EmbeddingClient;
use crate::error::EmbeddingError;
use crate::vector_base::VectorBase;

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// Wraps an `EmbeddingClient` with an LRU cache keyed by exact input text
/// and a `VectorBase` tracking every key ever added, so `fuzzy_lookup` can
/// answer nearest-neighbor queries without a second trip to the client.
///
/// Implements `EmbeddingClient` itself, so it can be dropped in wherever
/// an `Arc<dyn EmbeddingClient>` is expected — every embedding-backed
/// index gets caching and normalization for free.
pub struct CachingEmbeddingClient {
    inner: Arc<dyn EmbeddingClient>,
    cache: Mutex<EmbeddingCache>,
    keys: Mutex<Vec<String>>,
    raw_vectors: Mutex<Vec<Vec<f32>>>,
    vectors: Mutex<VectorBase>,
}

impl CachingEmbeddingClient {
    pub fn new(inner: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            inner,
            cache: Mutex::new(EmbeddingCache::new()),
            keys: Mutex::new(Vec::new()),
            raw_vectors: Mutex::new(Vec::new()),
            vectors: Mutex::new(VectorBase::new()),
        }
    }

    pub fn with_capacity(inner: Arc<dyn EmbeddingClient>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(EmbeddingCache::with_capacity(capacity)),
            keys: Mutex::new(Vec::new()),
            raw_vectors: Mutex::new(Vec::new()),
            vectors: Mutex::new(VectorBase::new()),
        }
    }

    /// Returns `text`'s normalized embedding, computing and caching it on
    /// a miss.
    pub async fn get_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(hit) = self.cache.lock().unwrap().get(text) {
            return Ok(hit);
        }
        let embedding = normalize(self.inner.embed(text).await?);
        self.cache.lock().unwrap().put(text, embedding.clone());
        Ok(embedding)
    }

    /// Batches every cache miss in `texts` into a single `embed_batch`
    /// call, preserving input order in the result.
    pub async fn get_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut to_fetch = Vec::new();
        {
            let mut cache = self.cache.lock().unwrap();
            for text in texts {
                results.push(cache.get(text));
            }
            for (text, result) in texts.iter().zip(&results) {
                if result.is_none() {
                    to_fetch.push(text.clone());
                }
            }
        }
        if !to_fetch.is_empty() {
            debug!(count = to_fetch.len(), "fetching uncached embeddings in one batch");
            let fetched = self.inner.embed_batch(&to_fetch).await?;
            if fetched.len() != to_fetch.len() {
                return Err(EmbeddingError::BatchCountMismatch { expected: to_fetch.len(), got: fetched.len() });
            }
            let mut cache = self.cache.lock().unwrap();
            let mut fetched = fetched.into_iter();
            for (text, result) in texts.iter().zip(results.iter_mut()) {
                if result.is_none() {
                    let embedding = normalize(fetched.next().expect("one fetched vector per uncached text"));
                    cache.put(text, embedding.clone());
                    *result = Some(embedding);
                }
            }
        }
        Ok(results.into_iter().map(|r| r.expect("every position filled by cache hit or fetch")).collect())
    }

    /// Inserts a precomputed `vector` for `key`, normalizing it first.
    /// Used to seed the cache from a deserialized snapshot without
    /// re-calling the embedding client.
    pub fn add_embedding(&self, key: &str, vector: Vec<f32>) {
        let vector = normalize(vector);
        self.cache.lock().unwrap().put(key, vector.clone());
        self.register_key(key, vector);
    }

    /// Ensures `key` has an embedding (computing it if necessary) and
    /// registers it in the fuzzy vector base. `cache` controls whether the
    /// exact-text cache entry is kept afterward; the vector base entry is
    /// kept either way, matching spec.md §4.1's `add_key(key, cache?)`.
    pub async fn add_key(&self, key: &str, cache: bool) -> Result<(), EmbeddingError> {
        let embedding = self.get_embedding(key).await?;
        self.register_key(key, embedding);
        if !cache {
            self.cache.lock().unwrap().evict(key);
        }
        Ok(())
    }

    /// Batched form of [`Self::add_key`].
    pub async fn add_keys(&self, keys: &[String], cache: bool) -> Result<(), EmbeddingError> {
        let embeddings = self.get_embeddings(keys).await?;
        for (key, embedding) in keys.iter().zip(embeddings) {
            self.register_key(key, embedding);
        }
        if !cache {
            let mut c = self.cache.lock().unwrap();
            for key in keys {
                c.evict(key);
            }
        }
        Ok(())
    }

    fn register_key(&self, key: &str, vector: Vec<f32>) {
        let mut keys = self.keys.lock().unwrap();
        if keys.iter().any(|k| k == key) {
            return;
        }
        let ordinal = keys.len();
        keys.push(key.to_string());
        self.raw_vectors.lock().unwrap().push(vector.clone());
        self.vectors.lock().unwrap().add(ordinal, vector);
    }

    /// Nearest-neighbor search by query text over every key registered via
    /// [`Self::add_key`]/[`Self::add_keys`]/[`Self::add_embedding`].
    /// Returns `(item_index, score)` pairs; an empty base yields an empty
    /// list, never an error.
    pub async fn fuzzy_lookup(&self, query_text: &str, max_hits: usize, min_score: f64) -> Result<Vec<(usize, f64)>, EmbeddingError> {
        let query = self.get_embedding(query_text).await?;
        Ok(self.fuzzy_lookup_vector(&query, max_hits, min_score))
    }

    /// As [`Self::fuzzy_lookup`], but against an already-computed query
    /// vector (itself expected to be unit-normalized).
    pub fn fuzzy_lookup_vector(&self, query: &[f32], max_hits: usize, min_score: f64) -> Vec<(usize, f64)> {
        self.vectors.lock().unwrap().nearest(query, max_hits, min_score)
    }

    /// The text registered at `item_index` by `fuzzy_lookup`, if any.
    pub fn key_at(&self, item_index: usize) -> Option<String> {
        self.keys.lock().unwrap().get(item_index).cloned()
    }

    /// Number of keys registered in the fuzzy vector base.
    pub fn size(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn clear(&self) {
        *self.cache.lock().unwrap() = EmbeddingCache::new();
        self.keys.lock().unwrap().clear();
        self.raw_vectors.lock().unwrap().clear();
        *self.vectors.lock().unwrap() = VectorBase::new();
    }

    /// Dumps every registered key and its normalized vector, in
    /// registration order, for persistence.
    pub fn serialize(&self) -> (Vec<String>, Vec<Vec<f32>>) {
        (self.keys.lock().unwrap().clone(), self.raw_vectors.lock().unwrap().clone())
    }

    /// Rebuilds the key/vector base from a prior [`Self::serialize`]
    /// without recomputing any embedding. The exact-text cache starts
    /// empty; `get_embedding` will re-populate it lazily.
    pub fn deserialize(inner: Arc<dyn EmbeddingClient>, keys: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self, EmbeddingError> {
        if keys.len() != vectors.len() {
            return Err(EmbeddingError::BatchCountMismatch { expected: keys.len(), got: vectors.len() });
        }
        let client = Self::new(inner);
        {
            let mut base = client.vectors.lock().unwrap();
            for (ordinal, vector) in vectors.iter().enumerate() {
                base.add(ordinal, vector.clone());
            }
        }
        *client.raw_vectors.lock().unwrap() = vectors;
        *client.keys.lock().unwrap() = keys;
        Ok(client)
    }
}

#[async_trait]
impl EmbeddingClient for CachingEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.get_embedding(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.get_embeddings(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_client::DeterministicTestEmbeddingClient;

    fn client() -> Arc<dyn EmbeddingClient> {
        Arc::new(DeterministicTestEmbeddingClient::default())
    }

    #[tokio::test]
    async fn get_embedding_is_unit_normalized() {
        let caching = CachingEmbeddingClient::new(client());
        let v = caching.get_embedding("hello world").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[tokio::test]
    async fn repeat_lookup_hits_cache() {
        let caching = CachingEmbeddingClient::new(client());
        let a = caching.get_embedding("python").await.unwrap();
        let b = caching.get_embedding("python").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fuzzy_lookup_empty_base_returns_empty_list() {
        let caching = CachingEmbeddingClient::new(client());
        let results = caching.fuzzy_lookup("anything", 5, 0.0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn add_key_then_fuzzy_lookup_finds_itself() {
        let caching = CachingEmbeddingClient::new(client());
        caching.add_key("python programming", true).await.unwrap();
        caching.add_key("cooking recipes", true).await.unwrap();
        let results = caching.fuzzy_lookup("python programming", 5, 0.0).await.unwrap();
        assert_eq!(results[0].0, 0);
    }

    #[tokio::test]
    async fn get_embeddings_batches_uncached_inputs() {
        let caching = CachingEmbeddingClient::new(client());
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let first = caching.get_embeddings(&texts).await.unwrap();
        let second = caching.get_embeddings(&texts).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn serialize_deserialize_round_trips() {
        let caching = CachingEmbeddingClient::new(client());
        caching.add_key("alpha", true).await.unwrap();
        let (keys, vectors) = caching.serialize();
        let restored = CachingEmbeddingClient::deserialize(client(), keys, vectors).unwrap();
        assert_eq!(restored.size(), 1);
        assert_eq!(restored.key_at(0), Some("alpha".to_string()));
    }
}
