//! Validation errors for the data model.
//!
//! Fatal for the offending item; callers surface these rather than retry
//! them, since a malformed entity or action cannot become valid by waiting.

use thiserror::Error;

/// Errors raised when constructing or appending to the data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("entity must have at least one type: {name}")]
    EntityMissingType { name: String },

    #[error("action must have at least one verb")]
    ActionMissingVerb,

    #[error("unknown knowledge type: {0}")]
    UnknownKnowledgeType(String),

    #[error("negative ordinal: {0}")]
    NegativeOrdinal(i64),

    #[error("semantic ref range refers to unknown message ordinal {message_ordinal}")]
    RangeRefersToUnknownMessage { message_ordinal: usize },

    #[error("action role name `{name}` does not resolve to \"none\" or an existing entity")]
    DanglingActionRole { name: String },

    #[error("message must have at least one text chunk")]
    MessageMissingChunk,
}
