//! Terms and scored results: the vocabulary the index and search layers
//! operate on.

use serde::{Deserialize, Serialize};

/// A single search term, case-folded by convention at the point of lookup
/// (terms themselves are stored and compared as ordinary strings; folding
/// is the caller's responsibility, matching `km-index`'s postings keys).
/// `weight` carries a relevance score when the term came back from a
/// scored lookup (e.g. a fuzzy related-terms match); authored aliases
/// normally leave it `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Term {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), weight: None }
    }

    pub fn with_weight(text: impl Into<String>, weight: f64) -> Self {
        Self { text: text.into(), weight: Some(weight) }
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::new(s)
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term::new(s)
    }
}

/// A semantic ref ordinal paired with a relevance score, the unit result
/// of term/property/embedding lookups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSemanticRef {
    pub semantic_ref_ordinal: usize,
    pub score: f64,
}

impl ScoredSemanticRef {
    pub fn new(semantic_ref_ordinal: usize, score: f64) -> Self {
        Self { semantic_ref_ordinal, score }
    }
}

/// A message ordinal paired with a relevance score, the unit result of
/// message-text embedding search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMessage {
    pub message_ordinal: usize,
    pub score: f64,
}

impl ScoredMessage {
    pub fn new(message_ordinal: usize, score: f64) -> Self {
        Self { message_ordinal, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_from_str_and_string_agree() {
        assert_eq!(Term::from("hello"), Term::from("hello".to_string()));
    }
}
