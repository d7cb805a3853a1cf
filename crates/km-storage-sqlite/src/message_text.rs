//! `MessageTextIndexProvider` over the `MessageTextIndex` table.
//! Embeddings are computed by the shared `EmbeddingClient` and stored as
//! little-endian float32 blobs; nearest-neighbor search loads every row
//! and scores it in Rust, matching the teacher's "no specialized vector
//! database" tradeoff for a single-file backend.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::{Message, ScoredMessage};
use km_embedding::{cosine_similarity, EmbeddingClient};
use km_storage::{MessageTextIndexProvider, StorageError};
use sqlx::{Row, SqlitePool};

use crate::pool::{decode_embedding, encode_embedding};

pub struct SqliteMessageTextIndex {
    pool: SqlitePool,
    client: Arc<dyn EmbeddingClient>,
}

impl SqliteMessageTextIndex {
    pub fn new(pool: SqlitePool, client: Arc<dyn EmbeddingClient>) -> Self {
        Self { pool, client }
    }

    async fn nearest(&self, query: &[f32], max_matches: usize, threshold: f64, subset: Option<&[usize]>) -> Result<Vec<ScoredMessage>, StorageError> {
        let rows = sqlx::query("SELECT msg_id, chunk_ordinal, embedding FROM MessageTextIndex")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut best: Vec<(usize, f64)> = Vec::new();
        for row in rows {
            let msg_id: i64 = row.try_get("msg_id").map_err(|e| StorageError::Backend(e.to_string()))?;
            let ordinal = msg_id as usize;
            if let Some(subset) = subset {
                if !subset.contains(&ordinal) {
                    continue;
                }
            }
            let blob: Vec<u8> = row.try_get("embedding").map_err(|e| StorageError::Backend(e.to_string()))?;
            let embedding = decode_embedding(&blob);
            let score = cosine_similarity(query, &embedding);
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
        Ok(results)
    }
}

#[async_trait]
impl MessageTextIndexProvider for SqliteMessageTextIndex {
    async fn add_messages_starting_at(&self, start_ordinal: usize, messages: &[Message]) -> Result<(), StorageError> {
        for (offset, message) in messages.iter().enumerate() {
            let message_ordinal = start_ordinal + offset;
            let embeddings = self.client.embed_batch(&message.text_chunks).await.map_err(|e| StorageError::Backend(e.to_string()))?;
            for (chunk_ordinal, embedding) in embeddings.into_iter().enumerate() {
                sqlx::query("INSERT OR REPLACE INTO MessageTextIndex (msg_id, chunk_ordinal, embedding) VALUES (?1, ?2, ?3)")
                    .bind(message_ordinal as i64)
                    .bind(chunk_ordinal as i64)
                    .bind(encode_embedding(&embedding))
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn lookup_messages(&self, text: &str, max_matches: usize, threshold: f64) -> Result<Vec<ScoredMessage>, StorageError> {
        let query = self.client.embed(text).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        self.nearest(&query, max_matches, threshold, None).await
    }

    async fn lookup_messages_in_subset(
        &self,
        text: &str,
        subset: &[usize],
        max_matches: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredMessage>, StorageError> {
        let query = self.client.embed(text).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        self.nearest(&query, max_matches, threshold, Some(subset)).await
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM MessageTextIndex").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }

    async fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.size().await? == 0)
    }
}
