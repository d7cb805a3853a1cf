//! Tunables for one indexing run.

/// Configuration passed to [`crate::indexer::build_index`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Whether to send each chunk's text to the `LlmClient` in addition
    /// to the message's intrinsic knowledge (spec.md §4.8 step 2).
    pub auto_extract_knowledge: bool,
    /// How many messages' chunk texts to accumulate before flushing to
    /// the message-text and fuzzy related-terms indexes (spec.md §4.8
    /// step 7).
    pub embedding_batch_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { auto_extract_knowledge: false, embedding_batch_size: 16 }
    }
}
