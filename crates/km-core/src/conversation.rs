//! `Conversation`: the append-only aggregate of messages and the semantic
//! refs extracted from them.
//!
//! Both collections grow by ordinal only. Ordinals are assigned in order
//! starting at zero and are never reused, even across deletions, so that
//! indexes built against earlier ordinals stay valid.

use crate::error::ValidationError;
use crate::knowledge::NONE_ENTITY_NAME;
use crate::message::Message;
use crate::semantic_ref::SemanticRef;
use crate::text_range::TextRange;

/// The conversation's messages and the knowledge extracted from them.
///
/// This struct holds data only; indexing lives in `km-index` and
/// `km-storage` so that this crate has no knowledge of how either is
/// computed or persisted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    semantic_refs: Vec<SemanticRef>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, assigning it the next message ordinal.
    pub fn add_message(&mut self, message: Message) -> usize {
        let ordinal = self.messages.len();
        self.messages.push(message);
        ordinal
    }

    /// Appends a semantic ref whose range must refer only to messages
    /// already present in the conversation.
    pub fn add_semantic_ref(
        &mut self,
        range: TextRange,
        knowledge: crate::knowledge::Knowledge,
    ) -> Result<usize, ValidationError> {
        self.validate_range(&range)?;
        if let crate::knowledge::Knowledge::Action(action) = &knowledge {
            self.validate_action_roles(action)?;
        }
        let ordinal = self.semantic_refs.len();
        self.semantic_refs.push(SemanticRef::new(ordinal, range, knowledge));
        Ok(ordinal)
    }

    fn validate_range(&self, range: &TextRange) -> Result<(), ValidationError> {
        let max_ordinal = range.end.map(|e| e.message_ordinal).unwrap_or(range.start.message_ordinal);
        if range.start.message_ordinal >= self.messages.len() || max_ordinal > self.messages.len() {
            return Err(ValidationError::RangeRefersToUnknownMessage {
                message_ordinal: range.start.message_ordinal,
            });
        }
        Ok(())
    }

    /// Action roles must be either the "none" sentinel or the name of an
    /// entity already present among this conversation's semantic refs.
    /// This is a best-effort check against what's been appended so far;
    /// forward references within the same extraction batch are allowed
    /// by `km-pipeline` appending entities before the action that uses
    /// them.
    fn validate_action_roles(&self, action: &crate::knowledge::Action) -> Result<(), ValidationError> {
        for (_, name) in action.role_names() {
            if name == NONE_ENTITY_NAME {
                continue;
            }
            let known = self.semantic_refs.iter().any(|sr| {
                matches!(&sr.knowledge, crate::knowledge::Knowledge::Entity(e) if e.name == name)
            });
            if !known {
                return Err(ValidationError::DanglingActionRole { name: name.to_string() });
            }
        }
        Ok(())
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn semantic_ref_count(&self) -> usize {
        self.semantic_refs.len()
    }

    pub fn get_message(&self, ordinal: usize) -> Option<&Message> {
        self.messages.get(ordinal)
    }

    pub fn get_semantic_ref(&self, ordinal: usize) -> Option<&SemanticRef> {
        self.semantic_refs.get(ordinal)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn semantic_refs(&self) -> &[SemanticRef] {
        &self.semantic_refs
    }

    /// A half-open slice `[start, end)` of messages by ordinal, the
    /// primitive used to answer date-range and thread queries once an
    /// index has resolved them to message ordinals.
    pub fn get_message_slice(&self, start: usize, end: usize) -> &[Message] {
        let end = end.min(self.messages.len());
        if start >= end {
            return &[];
        }
        &self.messages[start..end]
    }
}
