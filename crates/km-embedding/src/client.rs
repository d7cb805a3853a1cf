//! The embedding client seam: anything that can turn text into vectors.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Generates embedding vectors for text. Implementations talk to a real
/// embedding API; `km-pipeline` and `km-conversation` depend only on this
/// trait, never on a concrete provider.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generates an embedding vector for a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generates embedding vectors for multiple texts in one call. The
    /// default implementation calls `embed` once per text; providers that
    /// support a real batch endpoint should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
