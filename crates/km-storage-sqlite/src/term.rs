//! `TermIndexProvider` over the `TermIndex` table.

use async_trait::async_trait;
use km_core::ScoredSemanticRef;
use km_index::normalize_term_text;
use km_storage::{StorageError, TermIndexProvider};
use sqlx::{Row, SqlitePool};

pub struct SqliteTermIndex {
    pool: SqlitePool,
}

impl SqliteTermIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TermIndexProvider for SqliteTermIndex {
    async fn add_term(&self, term: &str, ordinal: usize, score: Option<f64>) -> Result<(), StorageError> {
        let key = normalize_term_text(term);
        if key.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO TermIndex (term, sem_ref_id, score) VALUES (?1, ?2, ?3)
             ON CONFLICT(term, sem_ref_id) DO UPDATE SET score = COALESCE(excluded.score, TermIndex.score)",
        )
        .bind(key)
        .bind(ordinal as i64)
        .bind(score)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove_term(&self, term: &str, ordinal: usize) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM TermIndex WHERE term = ?1 AND sem_ref_id = ?2")
            .bind(normalize_term_text(term))
            .bind(ordinal as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Mirrors `km_index::TermToSemanticRefIndex::lookup_term`'s scoring
    /// rule for provider parity: if any posting carries an explicit
    /// score the whole list sorts by score descending (unscored postings
    /// treated as `0.0`); otherwise every posting reports `1.0` in
    /// insertion order.
    async fn lookup_term(&self, term: &str) -> Result<Vec<ScoredSemanticRef>, StorageError> {
        let rows = sqlx::query("SELECT sem_ref_id, score FROM TermIndex WHERE term = ?1 ORDER BY rowid")
            .bind(normalize_term_text(term))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let raw: Vec<(i64, Option<f64>)> = rows
            .into_iter()
            .map(|row| {
                let sem_ref_id: i64 = row.try_get("sem_ref_id").map_err(|e| StorageError::Backend(e.to_string()))?;
                let score: Option<f64> = row.try_get("score").map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok::<_, StorageError>((sem_ref_id, score))
            })
            .collect::<Result<_, _>>()?;
        let any_scored = raw.iter().any(|(_, score)| score.is_some());
        if any_scored {
            let mut scored: Vec<ScoredSemanticRef> =
                raw.into_iter().map(|(id, score)| ScoredSemanticRef { semantic_ref_ordinal: id as usize, score: score.unwrap_or(0.0) }).collect();
            scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            Ok(scored)
        } else {
            Ok(raw.into_iter().map(|(id, _)| ScoredSemanticRef { semantic_ref_ordinal: id as usize, score: 1.0 }).collect())
        }
    }

    async fn get_terms(&self) -> Result<Vec<String>, StorageError> {
        let rows =
            sqlx::query("SELECT DISTINCT term FROM TermIndex").fetch_all(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.into_iter().map(|row| row.try_get::<String, _>("term").map_err(|e| StorageError::Backend(e.to_string()))).collect()
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM TermIndex").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM TermIndex").execute(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
