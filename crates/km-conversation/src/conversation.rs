//! `Conversation`: the façade over a storage provider, the indexing
//! pipeline, and the embedding/LLM clients that back it.
//!
//! A `Conversation` is backend-agnostic once built — `provider` is a
//! `dyn StorageProvider` either backend satisfies — except for the
//! portable snapshot (spec.md §6), which this crate only implements for
//! the in-memory backend (see [`Conversation::to_snapshot`]): the
//! relational backend's own file already is its durable form, and
//! `km-storage-sqlite` does not expose the raw embedding vectors a
//! snapshot needs to export. A sqlite-backed conversation can still be
//! rebuilt from scratch and re-indexed against the same messages if a
//! portable copy is needed.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use km_core::{Message, ScoredMessage, ScoredSemanticRef, Term, TextRange, Thread};
use km_embedding::EmbeddingClient;
use km_index::{DateRange, PropertyName, ScoredThreadIndex, TimestampedTextRange};
use km_llm::LlmClient;
use km_pipeline::{build_index, IndexingEventHandlers, IndexingResults, NullEventHandlers, PipelineSettings};
use km_storage::StorageProvider;
use km_storage_memory::InMemoryStorageProvider;
use km_storage_sqlite::SqliteStorageProvider;
use tracing::info;

/// A conversation: its messages, the knowledge extracted from them, and
/// every secondary index built over that knowledge, fronted by one of
/// the two storage backends.
pub struct Conversation {
    name_tag: String,
    tags: Vec<String>,
    provider: Arc<dyn StorageProvider>,
    /// Present only when `provider` is backed by `InMemoryStorageProvider`
    /// — the handle `to_snapshot`/`from_snapshot` need for direct access
    /// to each index's raw embedding vectors.
    memory_provider: Option<Arc<InMemoryStorageProvider>>,
    llm_client: Option<Arc<dyn LlmClient>>,
    settings: PipelineSettings,
    embedding_dimension: usize,
    /// The "indexed upto" mark (spec.md §3 Lifecycle, §4.8): advances
    /// only past messages whose secondary-index writes have fully
    /// committed, so `build_index` can always resume from here.
    indexed_upto: usize,
}

impl Conversation {
    /// Creates an empty conversation backed by the in-memory provider.
    pub fn new_in_memory(
        name_tag: impl Into<String>,
        tags: Vec<String>,
        embedding_client: Arc<dyn EmbeddingClient>,
        embedding_dimension: usize,
        settings: PipelineSettings,
    ) -> Self {
        let name_tag = name_tag.into();
        let provider = Arc::new(InMemoryStorageProvider::new(embedding_client));
        info!(%name_tag, "created in-memory conversation");
        Self {
            name_tag,
            tags,
            provider: provider.clone(),
            memory_provider: Some(provider),
            llm_client: None,
            settings,
            embedding_dimension,
            indexed_upto: 0,
        }
    }

    /// Opens (creating if absent) a conversation backed by the relational
    /// provider at `database_url`.
    pub async fn open_sqlite(
        database_url: &str,
        name_tag: impl Into<String>,
        tags: Vec<String>,
        embedding_client: Arc<dyn EmbeddingClient>,
        embedding_dimension: usize,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let provider = SqliteStorageProvider::new(database_url, embedding_client)
            .await
            .with_context(|| format!("opening relational storage provider at {database_url}"))?;
        let name_tag = name_tag.into();
        info!(%name_tag, %database_url, "opened relational conversation");
        Ok(Self {
            name_tag,
            tags,
            provider: Arc::new(provider),
            memory_provider: None,
            llm_client: None,
            settings,
            embedding_dimension,
            indexed_upto: 0,
        })
    }

    /// Attaches a language-model client so subsequent `build_index` calls
    /// send chunk text for extraction (spec.md §4.8 step 2), in addition
    /// to each message's intrinsic knowledge.
    pub fn with_llm_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    pub fn name_tag(&self) -> &str {
        &self.name_tag
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The "indexed upto" mark after the last `build_index` call (0 if
    /// never built).
    pub fn indexed_upto(&self) -> usize {
        self.indexed_upto
    }

    /// Appends a message, never inserting mid-stream (spec.md §3
    /// Lifecycle). Does not index it — call `build_index` afterward.
    pub async fn add_message(&self, message: Message) -> Result<usize> {
        self.provider.get_message_collection().append(message).await.context("appending message")
    }

    /// Appends every message in `messages`, in order.
    pub async fn add_messages(&self, messages: Vec<Message>) -> Result<Vec<usize>> {
        self.provider.get_message_collection().extend(messages).await.context("appending messages")
    }

    pub async fn message_count(&self) -> Result<usize> {
        self.provider.get_message_collection().size().await.context("reading message count")
    }

    pub async fn semantic_ref_count(&self) -> Result<usize> {
        self.provider.get_semantic_ref_collection().size().await.context("reading semantic ref count")
    }

    pub async fn get_message(&self, ordinal: usize) -> Result<Option<Message>> {
        self.provider.get_message_collection().get_item(ordinal).await.context("reading message")
    }

    /// Runs (or resumes) a build over every message appended since the
    /// last `build_index` call, per spec.md §4.8's incremental-rebuild
    /// contract. Advances [`Self::indexed_upto`] to the result's mark.
    pub async fn build_index(&mut self, handlers: &dyn IndexingEventHandlers) -> Result<IndexingResults> {
        let results = build_index(self.provider.as_ref(), self.llm_client.as_deref(), &self.settings, self.indexed_upto, handlers)
            .await
            .context("running indexing pipeline")?;
        self.indexed_upto = results.indexed_upto;
        Ok(results)
    }

    /// As [`Self::build_index`], with a handler set that never aborts.
    pub async fn build_index_to_completion(&mut self) -> Result<IndexingResults> {
        self.build_index(&NullEventHandlers).await
    }

    pub async fn lookup_term(&self, term: &str) -> Result<Vec<ScoredSemanticRef>> {
        self.provider.get_term_index().lookup_term(term).await.context("looking up term")
    }

    pub async fn lookup_property(&self, name: PropertyName, value: &str) -> Result<Option<Vec<ScoredSemanticRef>>> {
        self.provider.get_property_index().lookup_property(name, value).await.context("looking up property")
    }

    /// Half-open `[start, end)`; a point query when `end` is `None`
    /// (spec.md §4.4).
    pub async fn lookup_timestamp_range(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Vec<TimestampedTextRange>> {
        self.provider.get_timestamp_index().lookup_range(DateRange::new(start, end)).await.context("looking up timestamp range")
    }

    pub async fn lookup_messages(&self, text: &str, max_matches: usize, threshold: f64) -> Result<Vec<ScoredMessage>> {
        self.provider.get_message_text_index().lookup_messages(text, max_matches, threshold).await.context("looking up messages by text")
    }

    pub async fn lookup_messages_in_subset(&self, text: &str, subset: &[usize], max_matches: usize, threshold: f64) -> Result<Vec<ScoredMessage>> {
        self.provider
            .get_message_text_index()
            .lookup_messages_in_subset(text, subset, max_matches, threshold)
            .await
            .context("looking up messages by text within a subset")
    }

    /// Authors an alias for `term`, never touched by the embedding
    /// pipeline (spec.md §4.6).
    pub async fn add_related_term(&self, term: &str, related: Vec<Term>) -> Result<()> {
        self.provider.get_related_terms_index().add_related_term(term, related).await.context("adding related term alias")
    }

    /// The combined "related terms of X" lookup: aliases first, fuzzy
    /// neighbors augmenting, duplicates collapsed by text (spec.md §4.6).
    pub async fn lookup_related_terms(&self, term: &str, max_hits: usize, threshold: f64) -> Result<Vec<Term>> {
        self.provider.get_related_terms_index().lookup_related(term, max_hits, threshold).await.context("looking up related terms")
    }

    pub async fn add_thread(&self, thread: Thread) -> Result<usize> {
        self.provider.get_thread_index().add_thread(thread).await.context("adding thread")
    }

    pub async fn lookup_thread(&self, description: &str, max_matches: usize, threshold: f64) -> Result<Option<Vec<ScoredThreadIndex>>> {
        self.provider.get_thread_index().lookup_thread(description, max_matches, threshold).await.context("looking up thread")
    }

    /// A half-open slice `[start, end)` of messages, the primitive that
    /// resolves a timestamp or thread lookup's ordinals back to text.
    pub async fn get_message_slice(&self, start: usize, end: usize) -> Result<Vec<Message>> {
        self.provider.get_message_collection().get_slice(start, end).await.context("reading message slice")
    }

    /// Resolves a range to the text it covers, honoring tombstoned
    /// messages per spec.md §9 Open Question (b): a deleted message's
    /// text is still returned here, since compaction is a non-goal and
    /// callers must be able to inspect what a reference pointed at.
    pub async fn resolve_range(&self, range: &TextRange) -> Result<Vec<Message>> {
        let end = range.end.map(|e| e.message_ordinal + 1).unwrap_or(range.start.message_ordinal + 1);
        self.get_message_slice(range.start.message_ordinal, end).await
    }

    /// Writes the portable snapshot (spec.md §6) to `{prefix}_data.json`
    /// and `{prefix}_embeddings.bin`. Only available when this
    /// conversation is backed by the in-memory provider.
    pub async fn to_snapshot(&self, prefix: impl AsRef<Path>) -> Result<()> {
        let memory = self.memory_provider.as_ref().ok_or_else(|| anyhow!("snapshotting is only supported for in-memory conversations"))?;
        let (json, vectors) = memory.to_snapshot(&self.name_tag, &self.tags).await.context("building snapshot")?;
        km_storage::write_snapshot_files(prefix, &json, &vectors).await.context("writing snapshot files")?;
        Ok(())
    }

    /// Loads a conversation from a snapshot written by [`Self::to_snapshot`],
    /// reconstructing an in-memory provider from it.
    pub async fn from_snapshot(
        prefix: impl AsRef<Path>,
        embedding_client: Arc<dyn EmbeddingClient>,
        embedding_dimension: usize,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let loaded = km_storage::read_snapshot_files(&prefix, embedding_dimension).await.context("reading snapshot files")?;
        let indexed_upto = loaded.messages.len();
        let (provider, name_tag, tags) =
            InMemoryStorageProvider::from_snapshot(loaded, embedding_client).await.context("reconstructing provider from snapshot")?;
        let provider = Arc::new(provider);
        Ok(Self {
            name_tag,
            tags,
            provider: provider.clone(),
            memory_provider: Some(provider),
            llm_client: None,
            settings,
            embedding_dimension,
            indexed_upto,
        })
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }

    /// Flushes and releases the underlying provider's resources.
    /// Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.provider.close().await.context("closing storage provider")
    }
}
