//! The knowledge extraction seam: anything that can read message text and
//! produce structured knowledge from it.

use async_trait::async_trait;
use km_core::KnowledgeResponse;

use crate::error::ExtractionError;

/// Extracts entities, actions and topics from message text. Implementations
/// wrap a concrete LLM; `km-pipeline` depends only on this trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Extracts knowledge from a single message's full text. An empty
    /// `KnowledgeResponse` is a valid (if uninteresting) result; it means
    /// nothing was found, not that extraction failed.
    async fn extract_knowledge(&self, text: &str) -> Result<KnowledgeResponse, ExtractionError>;
}
