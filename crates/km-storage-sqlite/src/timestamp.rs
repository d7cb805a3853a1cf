//! `TimestampIndexProvider` over the `TimestampIndex` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use km_core::TextRange;
use km_index::{DateRange, TimestampedTextRange};
use km_storage::{StorageError, TimestampIndexProvider};
use sqlx::{Row, SqlitePool};

pub struct SqliteTimestampIndex {
    pool: SqlitePool,
}

impl SqliteTimestampIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimestampIndexProvider for SqliteTimestampIndex {
    async fn add_timestamp(&self, message_ordinal: usize, timestamp: &str) -> Result<(), StorageError> {
        let parsed = DateTime::parse_from_rfc3339(timestamp).map_err(|_| StorageError::Backend(format!("invalid ISO-8601 timestamp `{timestamp}`")))?;
        sqlx::query("INSERT OR REPLACE INTO TimestampIndex (msg_id, timestamp) VALUES (?1, ?2)")
            .bind(message_ordinal as i64)
            .bind(parsed.with_timezone(&Utc).to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Half-open `[start, end)`, or a point query at `start` with `end`
    /// absent — filtering happens in Rust rather than SQL so the
    /// comparison uses the same `DateTime<Utc>` ordering the in-memory
    /// index uses, not SQLite's text collation.
    async fn lookup_range(&self, range: DateRange) -> Result<Vec<TimestampedTextRange>, StorageError> {
        let rows = sqlx::query("SELECT msg_id, timestamp FROM TimestampIndex")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut hits = Vec::new();
        for row in rows {
            let msg_id: i64 = row.try_get("msg_id").map_err(|e| StorageError::Backend(e.to_string()))?;
            let timestamp_str: String = row.try_get("timestamp").map_err(|e| StorageError::Backend(e.to_string()))?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str).map_err(|e| StorageError::Backend(e.to_string()))?.with_timezone(&Utc);
            let matches = match range.end {
                Some(end) => timestamp >= range.start && timestamp < end,
                None => timestamp == range.start,
            };
            if matches {
                hits.push(TimestampedTextRange { range: TextRange::for_message(msg_id as usize), timestamp });
            }
        }
        hits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.range.start.message_ordinal.cmp(&b.range.start.message_ordinal)));
        Ok(hits)
    }

    async fn size(&self) -> Result<usize, StorageError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM TimestampIndex").fetch_one(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n as usize)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM TimestampIndex").execute(&self.pool).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn pool() -> SqlitePool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_str().unwrap().to_string();
        let pool = crate::pool::open(&path).await.unwrap();
        std::mem::forget(dir);
        pool
    }

    #[tokio::test]
    async fn invalid_timestamp_is_rejected() {
        let index = SqliteTimestampIndex::new(pool().await);
        assert!(index.add_timestamp(0, "not a timestamp").await.is_err());
    }

    #[tokio::test]
    async fn half_open_range_excludes_the_end_timestamp() {
        let index = SqliteTimestampIndex::new(pool().await);
        index.add_timestamp(0, "2024-01-01T00:00:00Z").await.unwrap();
        index.add_timestamp(1, "2024-01-02T00:00:00Z").await.unwrap();
        index.add_timestamp(2, "2024-01-03T00:00:00Z").await.unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let hits = index.lookup_range(DateRange::new(start, Some(end))).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn point_query_between_timestamps_is_empty() {
        let index = SqliteTimestampIndex::new(pool().await);
        index.add_timestamp(0, "2024-01-01T00:00:00Z").await.unwrap();
        let midpoint = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let hits = index.lookup_range(DateRange::new(midpoint, None)).await.unwrap();
        assert!(hits.is_empty());
    }
}
