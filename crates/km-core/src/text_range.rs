//! Locations and ranges into a message's text chunks.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single point within a message: which text chunk, and optionally which
/// character offset within it. `char_ordinal` defaults to 0 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLocation {
    pub message_ordinal: usize,
    #[serde(default)]
    pub chunk_ordinal: usize,
    #[serde(default)]
    pub char_ordinal: usize,
}

impl TextLocation {
    pub fn new(message_ordinal: usize) -> Self {
        Self { message_ordinal, chunk_ordinal: 0, char_ordinal: 0 }
    }

    pub fn at_chunk(message_ordinal: usize, chunk_ordinal: usize) -> Self {
        Self { message_ordinal, chunk_ordinal, char_ordinal: 0 }
    }
}

impl PartialOrd for TextLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic over (message_ordinal, chunk_ordinal, char_ordinal), the
/// ordering a half-open `TextRange` relies on for containment.
impl Ord for TextLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.message_ordinal, self.chunk_ordinal, self.char_ordinal).cmp(&(
            other.message_ordinal,
            other.chunk_ordinal,
            other.char_ordinal,
        ))
    }
}

/// A half-open span `[start, end)` over one or more messages. `end` of
/// `None` means the range covers exactly the single point at `start`
/// (typically a whole message, chunk-addressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start: TextLocation,
    #[serde(default)]
    pub end: Option<TextLocation>,
}

impl TextRange {
    pub fn new(start: TextLocation, end: Option<TextLocation>) -> Self {
        Self { start, end }
    }

    /// A range covering exactly one message (no `end`).
    pub fn for_message(message_ordinal: usize) -> Self {
        Self { start: TextLocation::new(message_ordinal), end: None }
    }

    /// Whether `loc` falls within this range. With no `end`, only the
    /// start location itself matches.
    pub fn contains(&self, loc: &TextLocation) -> bool {
        match &self.end {
            None => &self.start == loc,
            Some(end) => &self.start <= loc && loc < end,
        }
    }

    /// Whether this range and `other` overlap at all.
    pub fn overlaps_with(&self, other: &TextRange) -> bool {
        let self_end = self.end.unwrap_or(self.start);
        let other_end = other.end.unwrap_or(other.start);
        self.start <= other_end && other.start <= self_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ordering_is_lexicographic() {
        let a = TextLocation { message_ordinal: 1, chunk_ordinal: 0, char_ordinal: 5 };
        let b = TextLocation { message_ordinal: 1, chunk_ordinal: 1, char_ordinal: 0 };
        assert!(a < b);
    }

    #[test]
    fn range_without_end_contains_only_start() {
        let range = TextRange::for_message(3);
        assert!(range.contains(&TextLocation::new(3)));
        assert!(!range.contains(&TextLocation::new(4)));
    }

    #[test]
    fn range_with_end_is_half_open() {
        let range = TextRange::new(TextLocation::new(2), Some(TextLocation::new(5)));
        assert!(range.contains(&TextLocation::new(2)));
        assert!(range.contains(&TextLocation::new(4)));
        assert!(!range.contains(&TextLocation::new(5)));
    }

    #[test]
    fn overlapping_ranges_detected() {
        let a = TextRange::new(TextLocation::new(0), Some(TextLocation::new(3)));
        let b = TextRange::new(TextLocation::new(2), Some(TextLocation::new(6)));
        let c = TextRange::new(TextLocation::new(3), Some(TextLocation::new(6)));
        assert!(a.overlaps_with(&b));
        assert!(!a.overlaps_with(&c));
    }
}
