//! `TimestampIndexProvider` over a synchronous
//! `km_index::TimestampToTextRangeIndex`.

use async_trait::async_trait;
use km_index::{DateRange, TimestampToTextRangeIndex, TimestampedTextRange};
use km_storage::{StorageError, TimestampIndexProvider};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryTimestampIndex {
    inner: RwLock<TimestampToTextRangeIndex>,
}

impl InMemoryTimestampIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimestampIndexProvider for InMemoryTimestampIndex {
    async fn add_timestamp(&self, message_ordinal: usize, timestamp: &str) -> Result<(), StorageError> {
        self.inner.write().await.add_timestamp(message_ordinal, timestamp).map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn lookup_range(&self, range: DateRange) -> Result<Vec<TimestampedTextRange>, StorageError> {
        Ok(self.inner.read().await.lookup_range(range))
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.size())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn invalid_timestamp_surfaces_as_backend_error() {
        let index = InMemoryTimestampIndex::new();
        let err = index.add_timestamp(0, "not a timestamp").await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[tokio::test]
    async fn lookup_range_half_open() {
        let index = InMemoryTimestampIndex::new();
        index.add_timestamp(0, "2024-01-01T00:00:00Z").await.unwrap();
        index.add_timestamp(1, "2024-01-02T00:00:00Z").await.unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let hits = index.lookup_range(DateRange::new(start, Some(end))).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
