//! A deterministic extraction client for tests: no network calls, simple
//! rule-based extraction instead of an actual LLM.

use async_trait::async_trait;
use km_core::{ConcreteEntity, KnowledgeResponse, Topic};

use crate::client::LlmClient;
use crate::error::ExtractionError;

/// Extracts one topic per message (its full text, lowercased) and one
/// entity per capitalized word. Good enough to exercise the pipeline's
/// plumbing without depending on a real model.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTestLlmClient;

impl DeterministicTestLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for DeterministicTestLlmClient {
    async fn extract_knowledge(&self, text: &str) -> Result<KnowledgeResponse, ExtractionError> {
        let mut entities = Vec::new();
        for word in text.split_whitespace() {
            let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if cleaned.chars().next().is_some_and(|c| c.is_uppercase()) {
                entities.push(ConcreteEntity::new(cleaned, vec!["entity".to_string()])?);
            }
        }
        let topics = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![Topic { text: text.trim().to_lowercase() }]
        };
        Ok(KnowledgeResponse { entities, actions: Vec::new(), inverse_actions: Vec::new(), topics })
    }
}
