//! `ThreadIndexProvider` over the `Threads` table.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::Thread;
use km_embedding::{cosine_similarity, EmbeddingClient};
use km_index::ScoredThreadIndex;
use km_storage::{StorageError, ThreadIndexProvider};
use sqlx::{Row, SqlitePool};

use crate::pool::{decode_embedding, encode_embedding};

pub struct SqliteThreadIndex {
    pool: SqlitePool,
    client: Arc<dyn EmbeddingClient>,
}

impl SqliteThreadIndex {
    pub fn new(pool: SqlitePool, client: Arc<dyn EmbeddingClient>) -> Self {
        Self { pool, client }
    }
}

#[async_trait]
impl ThreadIndexProvider for SqliteThreadIndex {
    async fn add_thread(&self, thread: Thread) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM Threads").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let index: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        let embedding = self.client.embed(&thread.description).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let ranges_json = serde_json::to_string(&thread.ranges).map_err(|e| StorageError::Backend(e.to_string()))?;
        sqlx::query("INSERT INTO Threads (thread_id, description, embedding, ranges_json) VALUES (?1, ?2, ?3, ?4)")
            .bind(index)
            .bind(&thread.description)
            .bind(encode_embedding(&embedding))
            .bind(ranges_json)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(index as usize)
    }

    async fn lookup_thread(&self, description: &str, max_matches: usize, threshold: f64) -> Result<Option<Vec<ScoredThreadIndex>>, StorageError> {
        let rows = sqlx::query("SELECT thread_id, embedding FROM Threads")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if rows.is_empty() {
            return Ok(None);
        }
        let query = self.client.embed(description).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut scored = Vec::new();
        for row in rows {
            let thread_id: i64 = row.try_get("thread_id").map_err(|e| StorageError::Backend(e.to_string()))?;
            let blob: Vec<u8> = row.try_get("embedding").map_err(|e| StorageError::Backend(e.to_string()))?;
            let score = cosine_similarity(&query, &decode_embedding(&blob));
            if score >= threshold {
                scored.push(ScoredThreadIndex { thread_index: thread_id as usize, score });
            }
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.thread_index.cmp(&b.thread_index)));
        scored.truncate(max_matches);
        Ok(Some(scored))
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM Threads").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_core::TextRange;
    use km_embedding::DeterministicTestEmbeddingClient;

    async fn pool() -> SqlitePool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_str().unwrap().to_string();
        let pool = crate::pool::open(&path).await.unwrap();
        std::mem::forget(dir);
        pool
    }

    fn client() -> Arc<dyn EmbeddingClient> {
        Arc::new(DeterministicTestEmbeddingClient::default())
    }

    #[tokio::test]
    async fn empty_index_returns_none() {
        let index = SqliteThreadIndex::new(pool().await, client());
        assert_eq!(index.lookup_thread("anything", 5, 0.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_then_lookup_finds_thread() {
        let index = SqliteThreadIndex::new(pool().await, client());
        index.add_thread(Thread::new("trip planning", vec![TextRange::for_message(0)])).await.unwrap();
        let hits = index.lookup_thread("trip planning", 5, 0.0).await.unwrap().unwrap();
        assert_eq!(hits[0].thread_index, 0);
    }
}
