//! The six secondary indexes over a conversation's semantic refs and
//! messages: term postings, property postings, timestamp ranges, the
//! message-text embedding index, related terms (aliases + fuzzy), and
//! conversation threads.
//!
//! None of these indexes own a conversation; they're built and kept in
//! sync by `km-pipeline` and persisted by `km-storage`.

pub mod error;
pub mod message_text;
pub mod property;
pub mod related_terms;
pub mod term;
pub mod term_contributions;
pub mod term_text;
pub mod thread_index;
pub mod timestamp;

pub use error::DeserializationError;
pub use message_text::{MessageTextIndex, MessageTextIndexData};
pub use property::{entity_properties, action_properties, tag_properties, make_property_term_text, split_property_term_text, PropertyIndex, PropertyName};
pub use related_terms::{AliasData, AliasesIndex, FuzzyIndex, RelatedTermsIndex};
pub use term::{SemanticIndexData, TermToSemanticRefIndex};
pub use term_contributions::{action_terms, entity_terms, tag_terms, topic_terms};
pub use term_text::normalize_term_text;
pub use thread_index::{ScoredThreadIndex, ThreadIndex};
pub use timestamp::{DateRange, TimestampError, TimestampToTextRangeIndex, TimestampedTextRange};
