//! Callback hooks a build reports progress through, and can be aborted
//! from (spec.md §4.8).

/// Per-message hooks invoked during [`crate::build_index`]. Each returns
/// `true` to continue, `false` to abort the run gracefully.
///
/// Default implementations always continue, so callers only override the
/// hooks they care about (e.g. a progress bar only needs
/// `on_message_started`; a caller enforcing a deadline only needs to
/// return `false` once it's exceeded).
pub trait IndexingEventHandlers: Send + Sync {
    /// Called before any work begins on `message_ordinal`.
    fn on_message_started(&self, message_ordinal: usize) -> bool {
        let _ = message_ordinal;
        true
    }

    /// Called once knowledge extraction for `message_ordinal` has run.
    /// `success` is `false` only when LLM extraction was attempted and
    /// failed after retries; intrinsic knowledge is indexed either way.
    fn on_knowledge_extracted(&self, message_ordinal: usize, success: bool) -> bool {
        let _ = (message_ordinal, success);
        true
    }

    /// Called after a batch of embeddings has been computed and written
    /// to the message-text and fuzzy related-terms indexes, with the
    /// ordinal of the last message the batch covered.
    fn on_embeddings_created(&self, last_message_ordinal: usize) -> bool {
        let _ = last_message_ordinal;
        true
    }

    /// Called immediately after [`Self::on_embeddings_created`], once the
    /// batch's rows are visible to lookups.
    fn on_text_indexed(&self, last_message_ordinal: usize) -> bool {
        let _ = last_message_ordinal;
        true
    }
}

/// A handler set that never aborts — the default for callers with no
/// interest in progress reporting or cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventHandlers;

impl IndexingEventHandlers for NullEventHandlers {}
