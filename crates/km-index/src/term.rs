//! The primary term→semantic-ref postings index.

use indexmap::IndexMap;
use km_core::ScoredSemanticRef;
use serde::{Deserialize, Serialize};

use crate::term_text::normalize_term_text;

/// One posting: the semantic ref the term was indexed against, and an
/// optional relevance score. Unscored postings (the common case — the
/// indexing pipeline just says "this entity's name is this term") sort
/// after the term's insertion order is preserved; scored postings sort by
/// score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Posting {
    semantic_ref_ordinal: usize,
    score: Option<f64>,
}

/// Term → list of semantic refs that mention it.
///
/// Keys are case-folded and whitespace-normalized (`normalize_term_text`)
/// before lookup, so `"Bach"` and `"bach"` share one posting list.
#[derive(Debug, Clone, Default)]
pub struct TermToSemanticRefIndex {
    postings: IndexMap<String, Vec<Posting>>,
}

impl TermToSemanticRefIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `ordinal` to `term`'s postings, optionally with a relevance
    /// score. Idempotent: calling this again with the same `(term,
    /// ordinal)` pair does not duplicate the entry (the score, if given
    /// again, overwrites the stored one).
    pub fn add_term(&mut self, term: &str, ordinal: usize, score: Option<f64>) {
        let key = normalize_term_text(term);
        if key.is_empty() {
            return;
        }
        let list = self.postings.entry(key).or_default();
        if let Some(existing) = list.iter_mut().find(|p| p.semantic_ref_ordinal == ordinal) {
            if score.is_some() {
                existing.score = score;
            }
        } else {
            list.push(Posting { semantic_ref_ordinal: ordinal, score });
        }
    }

    /// Removes `ordinal` from `term`'s postings, if present.
    pub fn remove_term(&mut self, term: &str, ordinal: usize) {
        let key = normalize_term_text(term);
        if let Some(list) = self.postings.get_mut(&key) {
            list.retain(|p| p.semantic_ref_ordinal != ordinal);
        }
    }

    /// Removes `ordinal` from every term's postings, used when a
    /// semantic ref is retracted wholesale.
    pub fn remove_all_for_semref(&mut self, ordinal: usize) {
        for list in self.postings.values_mut() {
            list.retain(|p| p.semantic_ref_ordinal != ordinal);
        }
    }

    /// Looks up `term`, returning its postings. If any posting carries an
    /// explicit score the whole list is sorted by score descending
    /// (unscored postings sort as score `0.0`); otherwise the list is
    /// returned in insertion order with score `1.0`. Never returns `None`
    /// — a term with no postings yields an empty list.
    pub fn lookup_term(&self, term: &str) -> Vec<ScoredSemanticRef> {
        let key = normalize_term_text(term);
        let Some(list) = self.postings.get(&key) else {
            return Vec::new();
        };
        let any_scored = list.iter().any(|p| p.score.is_some());
        if any_scored {
            let mut scored: Vec<ScoredSemanticRef> = list
                .iter()
                .map(|p| ScoredSemanticRef::new(p.semantic_ref_ordinal, p.score.unwrap_or(0.0)))
                .collect();
            scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            scored
        } else {
            list.iter().map(|p| ScoredSemanticRef::new(p.semantic_ref_ordinal, 1.0)).collect()
        }
    }

    /// Every distinct term currently posted, in insertion order.
    pub fn get_terms(&self) -> Vec<String> {
        self.postings.keys().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.postings.len()
    }

    pub fn clear(&mut self) {
        self.postings.clear();
    }
}

/// The wire shape of one term's postings in the snapshot's
/// `semanticIndexData.items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SemanticRefIndexOrdinal {
    semantic_ref_ordinal: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SemanticIndexItem {
    term: String,
    semantic_ref_indices: Vec<SemanticRefIndexOrdinal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticIndexData {
    items: Vec<SemanticIndexItem>,
}

impl TermToSemanticRefIndex {
    pub fn serialize(&self) -> SemanticIndexData {
        SemanticIndexData {
            items: self
                .postings
                .iter()
                .map(|(term, postings)| SemanticIndexItem {
                    term: term.clone(),
                    semantic_ref_indices: postings
                        .iter()
                        .map(|p| SemanticRefIndexOrdinal { semantic_ref_ordinal: p.semantic_ref_ordinal, score: p.score })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn deserialize(data: SemanticIndexData) -> Self {
        let mut postings = IndexMap::new();
        for item in data.items {
            let list = item
                .semantic_ref_indices
                .into_iter()
                .map(|o| Posting { semantic_ref_ordinal: o.semantic_ref_ordinal, score: o.score })
                .collect();
            postings.insert(item.term, list);
        }
        Self { postings }
    }
}
