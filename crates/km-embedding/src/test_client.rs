//! A deterministic embedding client for tests: no network calls, no
//! external API, same text always yields the same vector.

use async_trait::async_trait;

use crate::client::EmbeddingClient;
use crate::error::EmbeddingError;

/// Hashes each word of the input into a fixed-dimension vector. Not a
/// real embedding model; only useful for exercising cache/index/search
/// plumbing where the actual semantics of similarity don't matter, only
/// that identical text embeds identically and different text (usually)
/// doesn't.
#[derive(Debug, Clone)]
pub struct DeterministicTestEmbeddingClient {
    dimension: usize,
}

impl DeterministicTestEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for DeterministicTestEmbeddingClient {
    fn default() -> Self {
        Self::new(16)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingClient for DeterministicTestEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let hash = fnv1a(word.as_bytes());
            let slot = (hash as usize) % self.dimension;
            vector[slot] += 1.0;
        }
        Ok(vector)
    }
}
