//! The message-text embedding index: one embedding per `(message, chunk)`,
//! searchable by cosine similarity with per-message score aggregation.

use std::sync::Arc;

use km_core::{Message, ScoredMessage, TextLocation};
use km_embedding::{cosine_similarity, EmbeddingClient, EmbeddingError};
use serde::{Deserialize, Serialize};

struct Entry {
    location: TextLocation,
    embedding: Vec<f32>,
}

/// Embeds every text chunk of every message and answers nearest-neighbor
/// lookups over them. When several chunks of the same message match a
/// query, the message's reported score is the maximum across its chunks
/// (spec.md §4.5).
pub struct MessageTextIndex {
    client: Arc<dyn EmbeddingClient>,
    entries: Vec<Entry>,
}

impl MessageTextIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { client, entries: Vec::new() }
    }

    /// Embeds and adds every chunk of `messages`, whose first element is
    /// message ordinal 0.
    pub async fn add_messages(&mut self, messages: &[Message]) -> Result<(), EmbeddingError> {
        self.add_messages_starting_at(0, messages).await
    }

    /// Embeds and adds every chunk of `messages`, whose ordinals start at
    /// `start_ordinal` — the incremental-build entry point.
    pub async fn add_messages_starting_at(&mut self, start_ordinal: usize, messages: &[Message]) -> Result<(), EmbeddingError> {
        for (offset, message) in messages.iter().enumerate() {
            let message_ordinal = start_ordinal + offset;
            let embeddings = self.client.embed_batch(&message.text_chunks).await?;
            for (chunk_ordinal, embedding) in embeddings.into_iter().enumerate() {
                self.entries.push(Entry { location: TextLocation::at_chunk(message_ordinal, chunk_ordinal), embedding });
            }
        }
        Ok(())
    }

    /// Embeds `text` and returns the top `max_matches` messages (by
    /// per-message max chunk score) whose score is at least `threshold`.
    /// Threshold filtering happens before the top-k truncation.
    pub async fn lookup_messages(&self, text: &str, max_matches: usize, threshold: f64) -> Result<Vec<ScoredMessage>, EmbeddingError> {
        let query = self.client.embed(text).await?;
        Ok(self.nearest_messages(&query, max_matches, threshold, None))
    }

    /// As [`Self::lookup_messages`], but only considers chunks belonging
    /// to a message ordinal in `subset`.
    pub async fn lookup_messages_in_subset(
        &self,
        text: &str,
        subset: &[usize],
        max_matches: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredMessage>, EmbeddingError> {
        let query = self.client.embed(text).await?;
        Ok(self.nearest_messages(&query, max_matches, threshold, Some(subset)))
    }

    fn nearest_messages(&self, query: &[f32], max_matches: usize, threshold: f64, subset: Option<&[usize]>) -> Vec<ScoredMessage> {
        let mut best: Vec<(usize, f64)> = Vec::new();
        for entry in &self.entries {
            let ordinal = entry.location.message_ordinal;
            if let Some(subset) = subset {
                if !subset.contains(&ordinal) {
                    continue;
                }
            }
            let score = cosine_similarity(query, &entry.embedding);
            match best.iter_mut().find(|(o, _)| *o == ordinal) {
                Some((_, existing)) => {
                    if score > *existing {
                        *existing = score;
                    }
                }
                None => best.push((ordinal, score)),
            }
        }
        let mut results: Vec<ScoredMessage> =
            best.into_iter().filter(|(_, score)| *score >= threshold).map(|(ordinal, score)| ScoredMessage::new(ordinal, score)).collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.message_ordinal.cmp(&b.message_ordinal)));
        results.truncate(max_matches);
        results
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The wire shape of `messageIndexData.indexData` — embeddings are
/// always `null` here; their bytes live in the sidecar file, in
/// declaration order following the related-terms fuzzy vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTextIndexData {
    pub text_locations: Vec<TextLocation>,
}

impl MessageTextIndex {
    /// Splits this index into its JSON-serializable location list and the
    /// raw embedding vectors for the sidecar, in location order.
    pub fn serialize(&self) -> (MessageTextIndexData, Vec<Vec<f32>>) {
        let locations = self.entries.iter().map(|e| e.location).collect();
        let vectors = self.entries.iter().map(|e| e.embedding.clone()).collect();
        (MessageTextIndexData { text_locations: locations }, vectors)
    }

    /// Rebuilds from a location list and the matching sidecar vectors
    /// (same length, same order) without re-calling the embedding client.
    pub fn deserialize(client: Arc<dyn EmbeddingClient>, data: MessageTextIndexData, vectors: Vec<Vec<f32>>) -> Self {
        let entries = data.text_locations.into_iter().zip(vectors).map(|(location, embedding)| Entry { location, embedding }).collect();
        Self { client, entries }
    }
}
