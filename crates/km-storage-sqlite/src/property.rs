//! `PropertyIndexProvider` over the `PropertyIndex` table. The `prop_name`
//! column mirrors `km_index::PropertyName`'s own string encoding, kept in
//! lockstep with [`km_index::make_property_term_text`]'s name half.

use async_trait::async_trait;
use km_core::ScoredSemanticRef;
use km_index::{normalize_term_text, PropertyName};
use km_storage::{PropertyIndexProvider, StorageError};
use sqlx::{Row, SqlitePool};

fn property_name_str(name: PropertyName) -> &'static str {
    match name {
        PropertyName::Name => "name",
        PropertyName::Type => "type",
        PropertyName::Verb => "verb",
        PropertyName::Subject => "subject",
        PropertyName::Object => "object",
        PropertyName::IndirectObject => "indirectObject",
        PropertyName::Tag => "tag",
        PropertyName::FacetName => "facet.name",
        PropertyName::FacetValue => "facet.value",
    }
}

pub struct SqlitePropertyIndex {
    pool: SqlitePool,
}

impl SqlitePropertyIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyIndexProvider for SqlitePropertyIndex {
    async fn add_property(&self, name: PropertyName, value: &str, ordinal: usize) -> Result<(), StorageError> {
        sqlx::query("INSERT OR IGNORE INTO PropertyIndex (prop_name, prop_value, sem_ref_id) VALUES (?1, ?2, ?3)")
            .bind(property_name_str(name))
            .bind(normalize_term_text(value))
            .bind(ordinal as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove_property(&self, name: PropertyName, value: &str, ordinal: usize) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM PropertyIndex WHERE prop_name = ?1 AND prop_value = ?2 AND sem_ref_id = ?3")
            .bind(property_name_str(name))
            .bind(normalize_term_text(value))
            .bind(ordinal as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove_all_for_semref(&self, ordinal: usize) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM PropertyIndex WHERE sem_ref_id = ?1")
            .bind(ordinal as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn lookup_property(&self, name: PropertyName, value: &str) -> Result<Option<Vec<ScoredSemanticRef>>, StorageError> {
        let rows = sqlx::query("SELECT sem_ref_id FROM PropertyIndex WHERE prop_name = ?1 AND prop_value = ?2 ORDER BY rowid")
            .bind(property_name_str(name))
            .bind(normalize_term_text(value))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if rows.is_empty() {
            return Ok(None);
        }
        let refs = rows
            .into_iter()
            .map(|row| {
                let sem_ref_id: i64 = row.try_get("sem_ref_id").map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok(ScoredSemanticRef { semantic_ref_ordinal: sem_ref_id as usize, score: 1.0 })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Some(refs))
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM PropertyIndex").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM PropertyIndex").execute(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_str().unwrap().to_string();
        let pool = crate::pool::open(&path).await.unwrap();
        std::mem::forget(dir);
        pool
    }

    #[tokio::test]
    async fn lookup_missing_is_none() {
        let index = SqlitePropertyIndex::new(pool().await);
        assert!(index.lookup_property(PropertyName::Name, "bach").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_all_for_semref_clears_every_property() {
        let index = SqlitePropertyIndex::new(pool().await);
        index.add_property(PropertyName::Name, "bach", 3).await.unwrap();
        index.add_property(PropertyName::Type, "person", 3).await.unwrap();
        index.remove_all_for_semref(3).await.unwrap();
        assert!(index.lookup_property(PropertyName::Name, "bach").await.unwrap().is_none());
        assert!(index.lookup_property(PropertyName::Type, "person").await.unwrap().is_none());
    }
}
