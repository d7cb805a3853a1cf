//! `MessageCollection` / `SemanticRefCollection` over the `Messages` and
//! `SemanticRefs` tables. Ordinals are the tables' primary keys, assigned
//! by the caller rather than `AUTOINCREMENT`, so they round-trip exactly
//! across a dump/restore.

use async_trait::async_trait;
use km_core::{DeletionInfo, Knowledge, KnowledgeResponse, Message, SemanticRef, TextRange};
use km_storage::{MessageCollection, SemanticRefCollection, StorageError};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Default, Serialize, Deserialize)]
struct ExtraJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    knowledge: Option<KnowledgeResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletion_info: Option<DeletionInfo>,
}

#[derive(Default, Serialize, Deserialize)]
struct MetadataJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

fn message_to_row(message: &Message) -> Result<(String, String, String, String), StorageError> {
    let chunks = serde_json::to_string(&message.text_chunks).map_err(|e| StorageError::Backend(e.to_string()))?;
    let extra = ExtraJson { knowledge: message.knowledge.clone(), deletion_info: message.deletion_info.clone() };
    let extra = serde_json::to_string(&extra).map_err(|e| StorageError::Backend(e.to_string()))?;
    let tags = serde_json::to_string(&message.tags).map_err(|e| StorageError::Backend(e.to_string()))?;
    let metadata = MetadataJson { timestamp: message.timestamp.clone() };
    let metadata = serde_json::to_string(&metadata).map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok((chunks, extra, tags, metadata))
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StorageError> {
    let chunks: String = row.try_get("chunks").map_err(|e| StorageError::Backend(e.to_string()))?;
    let extra: String = row.try_get("extra").map_err(|e| StorageError::Backend(e.to_string()))?;
    let tags: String = row.try_get("tags").map_err(|e| StorageError::Backend(e.to_string()))?;
    let metadata: String = row.try_get("metadata").map_err(|e| StorageError::Backend(e.to_string()))?;

    let text_chunks: Vec<String> = serde_json::from_str(&chunks).map_err(|e| StorageError::Backend(e.to_string()))?;
    let extra: ExtraJson = serde_json::from_str(&extra).map_err(|e| StorageError::Backend(e.to_string()))?;
    let tags: Vec<String> = serde_json::from_str(&tags).map_err(|e| StorageError::Backend(e.to_string()))?;
    let metadata: MetadataJson = serde_json::from_str(&metadata).map_err(|e| StorageError::Backend(e.to_string()))?;

    Ok(Message { text_chunks, tags, timestamp: metadata.timestamp, knowledge: extra.knowledge, deletion_info: extra.deletion_info })
}

pub struct SqliteMessageCollection {
    pool: SqlitePool,
}

impl SqliteMessageCollection {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_at(&self, ordinal: usize, message: &Message) -> Result<(), StorageError> {
        let (chunks, extra, tags, metadata) = message_to_row(message)?;
        sqlx::query("INSERT INTO Messages (msg_id, chunks, extra, tags, metadata) VALUES (?1, ?2, ?3, ?4, ?5)")
            .bind(ordinal as i64)
            .bind(chunks)
            .bind(extra)
            .bind(tags)
            .bind(metadata)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl MessageCollection for SqliteMessageCollection {
    async fn append(&self, message: Message) -> Result<usize, StorageError> {
        let ordinal = self.size().await?;
        self.insert_at(ordinal, &message).await?;
        Ok(ordinal)
    }

    async fn extend(&self, messages: Vec<Message>) -> Result<Vec<usize>, StorageError> {
        let start = self.size().await?;
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Backend(e.to_string()))?;
        for (offset, message) in messages.iter().enumerate() {
            let (chunks, extra, tags, metadata) = message_to_row(message)?;
            sqlx::query("INSERT INTO Messages (msg_id, chunks, extra, tags, metadata) VALUES (?1, ?2, ?3, ?4, ?5)")
                .bind((start + offset) as i64)
                .bind(chunks)
                .bind(extra)
                .bind(tags)
                .bind(metadata)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok((start..start + messages.len()).collect())
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM Messages").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }

    async fn get_item(&self, ordinal: usize) -> Result<Option<Message>, StorageError> {
        let row = sqlx::query("SELECT * FROM Messages WHERE msg_id = ?1")
            .bind(ordinal as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_message).transpose()
    }

    async fn get_slice(&self, start: usize, end: usize) -> Result<Vec<Message>, StorageError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM Messages WHERE msg_id >= ?1 AND msg_id < ?2 ORDER BY msg_id")
            .bind(start as i64)
            .bind(end as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter().map(row_to_message).collect()
    }

    async fn get_multiple(&self, ordinals: &[usize]) -> Result<Vec<Option<Message>>, StorageError> {
        let mut out = Vec::with_capacity(ordinals.len());
        for &ordinal in ordinals {
            out.push(self.get_item(ordinal).await?);
        }
        Ok(out)
    }

    async fn iter_all(&self) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query("SELECT * FROM Messages ORDER BY msg_id").fetch_all(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter().map(row_to_message).collect()
    }
}

fn semantic_ref_to_row(semantic_ref: &SemanticRef) -> Result<(String, String, String), StorageError> {
    let range_json = serde_json::to_string(&semantic_ref.range).map_err(|e| StorageError::Backend(e.to_string()))?;
    let knowledge_type = db_knowledge_type(&semantic_ref.knowledge);
    let knowledge_json = serde_json::to_string(&semantic_ref.knowledge).map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok((range_json, knowledge_type.to_string(), knowledge_json))
}

fn db_knowledge_type(knowledge: &Knowledge) -> &'static str {
    match knowledge {
        Knowledge::Entity(_) => "entity",
        Knowledge::Action(_) => "action",
        Knowledge::Topic(_) => "topic",
        Knowledge::Tag(_) => "tag",
    }
}

fn row_to_semantic_ref(row: &sqlx::sqlite::SqliteRow) -> Result<SemanticRef, StorageError> {
    let sem_ref_id: i64 = row.try_get("sem_ref_id").map_err(|e| StorageError::Backend(e.to_string()))?;
    let range_json: String = row.try_get("range_json").map_err(|e| StorageError::Backend(e.to_string()))?;
    let knowledge_json: String = row.try_get("knowledge_json").map_err(|e| StorageError::Backend(e.to_string()))?;
    let range: TextRange = serde_json::from_str(&range_json).map_err(|e| StorageError::Backend(e.to_string()))?;
    let knowledge: Knowledge = serde_json::from_str(&knowledge_json).map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(SemanticRef::new(sem_ref_id as usize, range, knowledge))
}

pub struct SqliteSemanticRefCollection {
    pool: SqlitePool,
}

impl SqliteSemanticRefCollection {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SemanticRefCollection for SqliteSemanticRefCollection {
    async fn append(&self, semantic_ref: SemanticRef) -> Result<usize, StorageError> {
        let ordinal = self.size().await?;
        let (range_json, knowledge_type, knowledge_json) = semantic_ref_to_row(&semantic_ref)?;
        sqlx::query("INSERT INTO SemanticRefs (sem_ref_id, range_json, knowledge_type, knowledge_json) VALUES (?1, ?2, ?3, ?4)")
            .bind(ordinal as i64)
            .bind(range_json)
            .bind(knowledge_type)
            .bind(knowledge_json)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(ordinal)
    }

    async fn extend(&self, semantic_refs: Vec<SemanticRef>) -> Result<Vec<usize>, StorageError> {
        let start = self.size().await?;
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Backend(e.to_string()))?;
        for (offset, semantic_ref) in semantic_refs.iter().enumerate() {
            let (range_json, knowledge_type, knowledge_json) = semantic_ref_to_row(semantic_ref)?;
            sqlx::query("INSERT INTO SemanticRefs (sem_ref_id, range_json, knowledge_type, knowledge_json) VALUES (?1, ?2, ?3, ?4)")
                .bind((start + offset) as i64)
                .bind(range_json)
                .bind(knowledge_type)
                .bind(knowledge_json)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok((start..start + semantic_refs.len()).collect())
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM SemanticRefs").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }

    async fn get_item(&self, ordinal: usize) -> Result<Option<SemanticRef>, StorageError> {
        let row = sqlx::query("SELECT * FROM SemanticRefs WHERE sem_ref_id = ?1")
            .bind(ordinal as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_semantic_ref).transpose()
    }

    async fn get_slice(&self, start: usize, end: usize) -> Result<Vec<SemanticRef>, StorageError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM SemanticRefs WHERE sem_ref_id >= ?1 AND sem_ref_id < ?2 ORDER BY sem_ref_id")
            .bind(start as i64)
            .bind(end as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter().map(row_to_semantic_ref).collect()
    }

    async fn get_multiple(&self, ordinals: &[usize]) -> Result<Vec<Option<SemanticRef>>, StorageError> {
        let mut out = Vec::with_capacity(ordinals.len());
        for &ordinal in ordinals {
            out.push(self.get_item(ordinal).await?);
        }
        Ok(out)
    }

    async fn iter_all(&self) -> Result<Vec<SemanticRef>, StorageError> {
        let rows =
            sqlx::query("SELECT * FROM SemanticRefs ORDER BY sem_ref_id").fetch_all(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter().map(row_to_semantic_ref).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_core::Tag;

    async fn pool() -> SqlitePool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_str().unwrap().to_string();
        let pool = crate::pool::open(&path).await.unwrap();
        std::mem::forget(dir);
        pool
    }

    #[tokio::test]
    async fn message_round_trips_through_json_columns() {
        let collection = SqliteMessageCollection::new(pool().await);
        let message = Message::new(vec!["hello".to_string()]).unwrap().with_timestamp("2024-01-01T00:00:00Z").with_tags(vec!["greeting".to_string()]);
        let ordinal = collection.append(message.clone()).await.unwrap();
        assert_eq!(ordinal, 0);
        let fetched = collection.get_item(0).await.unwrap().unwrap();
        assert_eq!(fetched, message);
    }

    #[tokio::test]
    async fn extend_assigns_contiguous_ordinals() {
        let collection = SqliteMessageCollection::new(pool().await);
        collection.append(Message::new(vec!["a".to_string()]).unwrap()).await.unwrap();
        let ordinals = collection.extend(vec![Message::new(vec!["b".to_string()]).unwrap(), Message::new(vec!["c".to_string()]).unwrap()]).await.unwrap();
        assert_eq!(ordinals, vec![1, 2]);
        assert_eq!(collection.size().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn semantic_ref_round_trips_with_its_ordinal() {
        let collection = SqliteSemanticRefCollection::new(pool().await);
        let sref = SemanticRef::new(0, TextRange::for_message(2), Knowledge::Tag(Tag { text: "funny".to_string() }));
        let ordinal = collection.append(sref.clone()).await.unwrap();
        let fetched = collection.get_item(ordinal).await.unwrap().unwrap();
        assert_eq!(fetched, sref);
    }

    #[tokio::test]
    async fn get_multiple_preserves_order_and_missing_as_none() {
        let collection = SqliteMessageCollection::new(pool().await);
        collection.extend(vec![Message::new(vec!["a".to_string()]).unwrap(), Message::new(vec!["b".to_string()]).unwrap()]).await.unwrap();
        let found = collection.get_multiple(&[1, 9, 0]).await.unwrap();
        assert_eq!(found[0].as_ref().unwrap().full_text(), "b");
        assert!(found[1].is_none());
        assert_eq!(found[2].as_ref().unwrap().full_text(), "a");
    }
}
