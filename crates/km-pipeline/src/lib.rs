//! The indexing pipeline: turns a conversation's raw messages into
//! semantic refs and keeps the six secondary indexes in sync with them,
//! either in one pass over a fresh conversation or incrementally as new
//! messages are appended (spec.md §4.8).
//!
//! This crate owns no storage of its own; it drives a
//! [`km_storage::StorageProvider`] and, optionally, a
//! [`km_llm::LlmClient`], writing through the async trait seams both
//! crates expose so it never needs to know which backend it's talking to.

pub mod error;
pub mod events;
pub mod indexer;
pub mod results;
pub mod settings;

pub use error::IndexingError;
pub use events::{IndexingEventHandlers, NullEventHandlers};
pub use indexer::build_index;
pub use results::{IndexingResults, SecondaryIndexResults, SubResult};
pub use settings::PipelineSettings;
