//! `RelatedTermsIndexProvider` over `RelatedTermsAliases` (exact,
//! authored) and `RelatedTermsFuzzy` (embedding-backed) tables.

use std::sync::Arc;

use async_trait::async_trait;
use km_core::Term;
use km_embedding::{cosine_similarity, EmbeddingClient};
use km_index::normalize_term_text;
use km_storage::{RelatedTermsIndexProvider, StorageError};
use sqlx::{Row, SqlitePool};

use crate::pool::{decode_embedding, encode_embedding};

pub struct SqliteRelatedTermsIndex {
    pool: SqlitePool,
    client: Arc<dyn EmbeddingClient>,
}

impl SqliteRelatedTermsIndex {
    pub fn new(pool: SqlitePool, client: Arc<dyn EmbeddingClient>) -> Self {
        Self { pool, client }
    }
}

#[async_trait]
impl RelatedTermsIndexProvider for SqliteRelatedTermsIndex {
    async fn add_related_term(&self, term: &str, related: Vec<Term>) -> Result<(), StorageError> {
        let key = normalize_term_text(term);
        for r in related {
            sqlx::query("INSERT OR IGNORE INTO RelatedTermsAliases (term, related_text, weight) VALUES (?1, ?2, ?3)")
                .bind(&key)
                .bind(&r.text)
                .bind(r.weight)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn lookup_aliases(&self, term: &str) -> Result<Option<Vec<Term>>, StorageError> {
        let rows = sqlx::query("SELECT related_text, weight FROM RelatedTermsAliases WHERE term = ?1 ORDER BY rowid")
            .bind(normalize_term_text(term))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if rows.is_empty() {
            return Ok(None);
        }
        let terms = rows
            .into_iter()
            .map(|row| {
                let text: String = row.try_get("related_text").map_err(|e| StorageError::Backend(e.to_string()))?;
                let weight: Option<f64> = row.try_get("weight").map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok(Term { text, weight })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Some(terms))
    }

    async fn add_fuzzy_terms(&self, terms: &[String]) -> Result<(), StorageError> {
        for text in terms {
            let key = normalize_term_text(text);
            let exists = sqlx::query("SELECT 1 AS present FROM RelatedTermsFuzzy WHERE term = ?1")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?
                .is_some();
            if exists {
                continue;
            }
            let embedding = self.client.embed(&key).await.map_err(|e| StorageError::Backend(e.to_string()))?;
            sqlx::query("INSERT INTO RelatedTermsFuzzy (term, embedding) VALUES (?1, ?2)")
                .bind(&key)
                .bind(encode_embedding(&embedding))
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn lookup_related(&self, term: &str, max_hits: usize, threshold: f64) -> Result<Vec<Term>, StorageError> {
        let mut combined = self.lookup_aliases(term).await?.unwrap_or_default();

        let query = self.client.embed(term).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let rows = sqlx::query("SELECT term, embedding FROM RelatedTermsFuzzy")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut scored: Vec<(String, f64)> = Vec::new();
        for row in rows {
            let text: String = row.try_get("term").map_err(|e| StorageError::Backend(e.to_string()))?;
            let blob: Vec<u8> = row.try_get("embedding").map_err(|e| StorageError::Backend(e.to_string()))?;
            let score = cosine_similarity(&query, &decode_embedding(&blob));
            if score >= threshold {
                scored.push((text, score));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(max_hits);
        for (text, score) in scored {
            if !combined.iter().any(|existing| existing.text == text) {
                combined.push(Term { text, weight: Some(score) });
            }
        }
        combined.truncate(max_hits);
        Ok(combined)
    }

    async fn size(&self) -> Result<(usize, usize), StorageError> {
        let alias_row =
            sqlx::query("SELECT COUNT(DISTINCT term) AS n FROM RelatedTermsAliases").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let alias_count: i64 = alias_row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        let fuzzy_row =
            sqlx::query("SELECT COUNT(*) AS n FROM RelatedTermsFuzzy").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let fuzzy_count: i64 = fuzzy_row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok((alias_count as usize, fuzzy_count as usize))
    }
}
