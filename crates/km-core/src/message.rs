//! Messages: the raw conversational turns that knowledge is extracted from.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::knowledge::{Action, ConcreteEntity, Topic};

/// The knowledge an extractor produced for one message, prior to being
/// split into individual `SemanticRef`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeResponse {
    #[serde(default)]
    pub entities: Vec<ConcreteEntity>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// The reverse form of an action, e.g. "A give to B" also yielding
    /// "B receive from A". Indexed identically to `actions`.
    #[serde(default)]
    pub inverse_actions: Vec<Action>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl KnowledgeResponse {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.actions.is_empty() && self.inverse_actions.is_empty() && self.topics.is_empty()
    }
}

/// Marks a message as logically deleted without physically removing it
/// from the collection, so existing ordinals stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionInfo {
    pub timestamp: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Anything that can answer the questions the indexing pipeline asks of a
/// conversation turn: its text, any knowledge already attached to it
/// (e.g. structured knowledge authored directly rather than extracted by
/// an LLM), and its tags.
///
/// `Message` is the only implementor in this crate; the trait exists so
/// `km-pipeline` can accept message types defined outside it.
pub trait KnowledgeSource {
    fn text_chunks(&self) -> &[String];
    fn get_knowledge(&self) -> Option<KnowledgeResponse>;
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Never empty; normally a single chunk, but long messages may be
    /// split into several that share one message ordinal.
    pub text_chunks: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub knowledge: Option<KnowledgeResponse>,
    #[serde(default)]
    pub deletion_info: Option<DeletionInfo>,
}

impl Message {
    pub fn new(text_chunks: Vec<String>) -> Result<Self, ValidationError> {
        if text_chunks.is_empty() {
            return Err(ValidationError::MessageMissingChunk);
        }
        Ok(Self {
            text_chunks,
            tags: Vec::new(),
            timestamp: None,
            knowledge: None,
            deletion_info: None,
        })
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_knowledge(mut self, knowledge: KnowledgeResponse) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_info.is_some()
    }

    /// Full text of the message, chunks joined by newlines, the form fed
    /// to the embedding client.
    pub fn full_text(&self) -> String {
        self.text_chunks.join("\n")
    }
}

impl KnowledgeSource for Message {
    fn text_chunks(&self) -> &[String] {
        &self.text_chunks
    }

    fn get_knowledge(&self) -> Option<KnowledgeResponse> {
        self.knowledge.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunks_rejected() {
        let err = Message::new(vec![]).unwrap_err();
        assert_eq!(err, ValidationError::MessageMissingChunk);
    }

    #[test]
    fn full_text_joins_chunks_with_newline() {
        let msg = Message::new(vec!["hello".to_string(), "world".to_string()]).unwrap();
        assert_eq!(msg.full_text(), "hello\nworld");
    }

    #[test]
    fn deletion_info_marks_deleted_without_removing_text() {
        let mut msg = Message::new(vec!["bye".to_string()]).unwrap();
        assert!(!msg.is_deleted());
        msg.deletion_info = Some(DeletionInfo { timestamp: "2024-01-01T00:00:00Z".to_string(), reason: None });
        assert!(msg.is_deleted());
        assert_eq!(msg.full_text(), "bye");
    }
}
