//! Async trait seams for the six secondary indexes. `km-storage-memory`
//! implements these as thin wrappers around the synchronous `km-index`
//! structures; `km-storage-sqlite` implements them as SQL queries. Both
//! providers are generic over these traits, so pipeline and façade code
//! never need to know which backend they're talking to.

use async_trait::async_trait;
use km_core::{ScoredMessage, ScoredSemanticRef, Term, Thread};
use km_index::{DateRange, PropertyName, ScoredThreadIndex, TimestampedTextRange};

use crate::error::StorageError;

#[async_trait]
pub trait TermIndexProvider: Send + Sync {
    async fn add_term(&self, term: &str, ordinal: usize, score: Option<f64>) -> Result<(), StorageError>;
    async fn remove_term(&self, term: &str, ordinal: usize) -> Result<(), StorageError>;
    async fn lookup_term(&self, term: &str) -> Result<Vec<ScoredSemanticRef>, StorageError>;
    async fn get_terms(&self) -> Result<Vec<String>, StorageError>;
    async fn size(&self) -> Result<usize, StorageError>;
    async fn clear(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PropertyIndexProvider: Send + Sync {
    async fn add_property(&self, name: PropertyName, value: &str, ordinal: usize) -> Result<(), StorageError>;
    async fn remove_property(&self, name: PropertyName, value: &str, ordinal: usize) -> Result<(), StorageError>;
    async fn remove_all_for_semref(&self, ordinal: usize) -> Result<(), StorageError>;
    async fn lookup_property(&self, name: PropertyName, value: &str) -> Result<Option<Vec<ScoredSemanticRef>>, StorageError>;
    async fn size(&self) -> Result<usize, StorageError>;
    async fn clear(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TimestampIndexProvider: Send + Sync {
    async fn add_timestamp(&self, message_ordinal: usize, timestamp: &str) -> Result<(), StorageError>;
    async fn lookup_range(&self, range: DateRange) -> Result<Vec<TimestampedTextRange>, StorageError>;
    async fn size(&self) -> Result<usize, StorageError>;
    async fn clear(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait MessageTextIndexProvider: Send + Sync {
    async fn add_messages_starting_at(&self, start_ordinal: usize, messages: &[km_core::Message]) -> Result<(), StorageError>;
    async fn lookup_messages(&self, text: &str, max_matches: usize, threshold: f64) -> Result<Vec<ScoredMessage>, StorageError>;
    async fn lookup_messages_in_subset(
        &self,
        text: &str,
        subset: &[usize],
        max_matches: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredMessage>, StorageError>;
    async fn size(&self) -> Result<usize, StorageError>;
    async fn is_empty(&self) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait RelatedTermsIndexProvider: Send + Sync {
    async fn add_related_term(&self, term: &str, related: Vec<Term>) -> Result<(), StorageError>;
    async fn lookup_aliases(&self, term: &str) -> Result<Option<Vec<Term>>, StorageError>;
    async fn add_fuzzy_terms(&self, terms: &[String]) -> Result<(), StorageError>;
    async fn lookup_related(&self, term: &str, max_hits: usize, threshold: f64) -> Result<Vec<Term>, StorageError>;
    /// `(alias count, fuzzy term count)`.
    async fn size(&self) -> Result<(usize, usize), StorageError>;
}

#[async_trait]
pub trait ThreadIndexProvider: Send + Sync {
    async fn add_thread(&self, thread: Thread) -> Result<usize, StorageError>;
    async fn lookup_thread(&self, description: &str, max_matches: usize, threshold: f64) -> Result<Option<Vec<ScoredThreadIndex>>, StorageError>;
    async fn size(&self) -> Result<usize, StorageError>;
}
