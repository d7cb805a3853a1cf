//! `IndexingResults`: the outcome of one [`crate::build_index`] run
//! (spec.md §7, final paragraph).

/// The outcome of indexing one kind of thing: how many were completed,
/// and the last error encountered along the way, if any. An error here
/// does not necessarily mean the run aborted — e.g. a per-message
/// extraction failure is recorded but indexing continues.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubResult {
    pub number_completed: usize,
    pub error: Option<String>,
}

/// The secondary-index half of a run's results, one sub-result per index
/// populated during the pass (spec.md §4.8 steps 5-7). The term index
/// has no sub-result of its own — every semantic ref that completes
/// contributes to the term index unconditionally, so its count is
/// implied by `IndexingResults::semantic_refs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondaryIndexResults {
    pub properties: SubResult,
    pub timestamps: SubResult,
    pub related_terms: SubResult,
    pub message: SubResult,
}

/// The full result of a [`crate::build_index`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexingResults {
    pub semantic_refs: SubResult,
    pub secondary_index_results: SecondaryIndexResults,
    /// The "indexed upto" mark after this run: the ordinal one past the
    /// last message whose embeddings were actually flushed. Pass this
    /// back in as the next call's `start_ordinal` to resume.
    pub indexed_upto: usize,
}
