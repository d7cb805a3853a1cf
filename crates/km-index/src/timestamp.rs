//! The timestamp → text-range index: answers half-open date-range
//! queries over messages that carry a timestamp.

use chrono::{DateTime, Utc};
use km_core::TextRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("invalid ISO-8601 timestamp `{0}`")]
    InvalidTimestamp(String),
}

/// A query range over timestamps. `end` of `None` makes this a point
/// query: only entries whose timestamp exactly equals `start` match.
/// With `end` present the query is half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }
}

/// One result row: the message's range (a whole-message `TextRange`,
/// since timestamps are recorded per message, not per chunk) paired with
/// its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedTextRange {
    pub range: TextRange,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    message_ordinal: usize,
    timestamp: DateTime<Utc>,
}

/// Maintains `(message_ordinal, timestamp)` pairs, kept sorted by
/// timestamp ascending (ties broken by message ordinal ascending) so
/// range lookups need no per-query sort.
#[derive(Debug, Clone, Default)]
pub struct TimestampToTextRangeIndex {
    entries: Vec<Entry>,
}

impl TimestampToTextRangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `timestamp` as RFC 3339 / ISO-8601 and records it against
    /// `message_ordinal`, keeping `entries` sorted.
    pub fn add_timestamp(&mut self, message_ordinal: usize, timestamp: &str) -> Result<(), TimestampError> {
        let parsed = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| TimestampError::InvalidTimestamp(timestamp.to_string()))?
            .with_timezone(&Utc);
        let entry = Entry { message_ordinal, timestamp: parsed };
        let pos = self
            .entries
            .partition_point(|e| (e.timestamp, e.message_ordinal) < (entry.timestamp, entry.message_ordinal));
        self.entries.insert(pos, entry);
        Ok(())
    }

    /// Half-open `[start, end)`, or a point query at `start` when `end`
    /// is absent. Results ordered by timestamp ascending, ties by message
    /// ordinal ascending (the index's natural order).
    pub fn lookup_range(&self, range: DateRange) -> Vec<TimestampedTextRange> {
        match range.end {
            Some(end) => self
                .entries
                .iter()
                .filter(|e| e.timestamp >= range.start && e.timestamp < end)
                .map(|e| TimestampedTextRange { range: TextRange::for_message(e.message_ordinal), timestamp: e.timestamp })
                .collect(),
            None => self
                .entries
                .iter()
                .filter(|e| e.timestamp == range.start)
                .map(|e| TimestampedTextRange { range: TextRange::for_message(e.message_ordinal), timestamp: e.timestamp })
                .collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn half_open_range_excludes_end() {
        let mut index = TimestampToTextRangeIndex::new();
        index.add_timestamp(0, "2025-01-01T00:00:00Z").unwrap();
        index.add_timestamp(1, "2025-01-01T00:30:00Z").unwrap();
        index.add_timestamp(2, "2025-01-01T01:00:00Z").unwrap();

        let first_only = index.lookup_range(DateRange::new(ts("2025-01-01T00:00:00Z"), Some(ts("2025-01-01T00:30:00Z"))));
        assert_eq!(first_only.len(), 1);

        let first_two = index.lookup_range(DateRange::new(ts("2025-01-01T00:00:00Z"), Some(ts("2025-01-01T01:00:00Z"))));
        assert_eq!(first_two.len(), 2);
    }

    #[test]
    fn point_query_matches_exact_timestamp_only() {
        let mut index = TimestampToTextRangeIndex::new();
        index.add_timestamp(0, "2025-01-01T00:00:00Z").unwrap();
        index.add_timestamp(1, "2025-01-01T01:00:00Z").unwrap();

        let at_second = index.lookup_range(DateRange::new(ts("2025-01-01T01:00:00Z"), None));
        assert_eq!(at_second.len(), 1);

        let between = index.lookup_range(DateRange::new(ts("2025-01-01T00:30:00Z"), None));
        assert!(between.is_empty());
    }

    #[test]
    fn results_sorted_by_timestamp_ascending() {
        let mut index = TimestampToTextRangeIndex::new();
        index.add_timestamp(2, "2025-01-03T00:00:00Z").unwrap();
        index.add_timestamp(0, "2025-01-01T00:00:00Z").unwrap();
        index.add_timestamp(1, "2025-01-02T00:00:00Z").unwrap();

        let all = index.lookup_range(DateRange::new(ts("2025-01-01T00:00:00Z"), Some(ts("2025-01-04T00:00:00Z"))));
        let ordinals: Vec<usize> = all.iter().map(|r| r.range.start.message_ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let mut index = TimestampToTextRangeIndex::new();
        assert!(index.add_timestamp(0, "not-a-timestamp").is_err());
    }
}
