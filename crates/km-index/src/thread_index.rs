//! Conversation threads: optional named groupings of text ranges, looked
//! up by embedding similarity over their descriptions.

use std::sync::Arc;

use km_core::{TextRange, Thread};
use km_embedding::{cosine_similarity, EmbeddingClient, EmbeddingError};
use serde::{Deserialize, Serialize};

/// A thread's index position paired with its match score against a
/// lookup query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredThreadIndex {
    pub thread_index: usize,
    pub score: f64,
}

struct Entry {
    thread: Thread,
    embedding: Vec<f32>,
}

/// Threads never participate in primary indexing (spec.md §4.7); this
/// index exists purely so a description can be matched back to the
/// ranges it groups.
pub struct ThreadIndex {
    client: Arc<dyn EmbeddingClient>,
    entries: Vec<Entry>,
}

impl ThreadIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { client, entries: Vec::new() }
    }

    pub async fn add_thread(&mut self, thread: Thread) -> Result<usize, EmbeddingError> {
        let embedding = self.client.embed(&thread.description).await?;
        let index = self.entries.len();
        self.entries.push(Entry { thread, embedding });
        Ok(index)
    }

    /// Returns `None` when no threads have been added; otherwise the
    /// matches (possibly empty) at or above `threshold`, truncated to
    /// `max_matches` and ordered by score descending. Tie-breaking among
    /// equal scores is by thread index ascending — upstream leaves this
    /// unspecified, so this is a deliberate, documented choice rather
    /// than a meaningful ranking (spec.md §9, Open Question c).
    pub async fn lookup_thread(&self, description: &str, max_matches: usize, threshold: f64) -> Result<Option<Vec<ScoredThreadIndex>>, EmbeddingError> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let query = self.client.embed(description).await?;
        let mut scored: Vec<ScoredThreadIndex> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| ScoredThreadIndex { thread_index: i, score: cosine_similarity(&query, &e.embedding) })
            .filter(|s| s.score >= threshold)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.thread_index.cmp(&b.thread_index)));
        scored.truncate(max_matches);
        Ok(Some(scored))
    }

    pub fn get_thread(&self, index: usize) -> Option<&Thread> {
        self.entries.get(index).map(|e| &e.thread)
    }

    pub fn covering(&self, range: &TextRange) -> Vec<usize> {
        self.entries.iter().enumerate().filter(|(_, e)| e.thread.covers(range)).map(|(i, _)| i).collect()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
