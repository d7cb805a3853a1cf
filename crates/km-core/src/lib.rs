//! Data model for the conversational knowledge memory.
//!
//! This crate defines the shapes everything else in the workspace builds
//! on: entities, actions, topics and tags (`knowledge`), the text ranges
//! they're anchored to (`text_range`), messages and the semantic refs
//! extracted from them (`message`, `semantic_ref`), threads spanning
//! several messages (`thread`), and the append-only `Conversation`
//! aggregate tying all of it together.
//!
//! Nothing here knows how to index, embed, extract or persist any of
//! this; those concerns live in `km-index`, `km-embedding`, `km-llm` and
//! `km-storage` respectively, all built against the types below.

pub mod conversation;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod semantic_ref;
pub mod term;
pub mod text_range;
pub mod thread;

pub use conversation::Conversation;
pub use error::ValidationError;
pub use knowledge::{
    Action, ActionParam, ConcreteEntity, Knowledge, KnowledgeType, Param, Tag, Topic, VerbTense,
    NONE_ENTITY_NAME,
};
pub use message::{DeletionInfo, KnowledgeResponse, KnowledgeSource, Message};
pub use semantic_ref::SemanticRef;
pub use term::{ScoredMessage, ScoredSemanticRef, Term};
pub use text_range::{TextLocation, TextRange};
pub use thread::Thread;
pub use value::{Facet, Quantity, Value};

pub mod value;
