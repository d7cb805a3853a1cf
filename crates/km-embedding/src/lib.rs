//! Embedding support for the conversational knowledge memory: the client
//! seam (`EmbeddingClient`), an LRU cache in front of it (`EmbeddingCache`),
//! and a linear-scan vector store for nearest-neighbor search
//! (`VectorBase`).

pub mod cache;
pub mod caching_client;
pub mod client;
pub mod error;
pub mod retry;
pub mod test_client;
pub mod vector_base;

pub use cache::EmbeddingCache;
pub use caching_client::CachingEmbeddingClient;
pub use client::EmbeddingClient;
pub use error::EmbeddingError;
pub use retry::with_retry;
pub use test_client::DeterministicTestEmbeddingClient;
pub use vector_base::{cosine_similarity, VectorBase};
