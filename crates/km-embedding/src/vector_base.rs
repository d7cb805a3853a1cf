//! A linear-scan vector store: every nearest-neighbor query compares the
//! query vector against all stored vectors by cosine similarity.
//!
//! This mirrors the reference implementation's own approach rather than
//! reaching for a real ANN index; conversations are small enough that an
//! O(n) scan per query is fine, and it keeps behavior exact and easy to
//! reason about.

/// Cosine similarity between two equal-length vectors, in `[-1.0, 1.0]`.
/// Returns `0.0` if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "cosine_similarity requires equal-length vectors");
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A single stored vector, identified by an opaque ordinal the caller
/// assigns (a semantic-ref ordinal or message ordinal, depending on which
/// index owns this base).
#[derive(Debug, Clone)]
struct Entry {
    ordinal: usize,
    vector: Vec<f32>,
}

/// An append-only collection of embedding vectors supporting top-k cosine
/// similarity search by linear scan.
#[derive(Debug, Clone, Default)]
pub struct VectorBase {
    entries: Vec<Entry>,
}

impl VectorBase {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add(&mut self, ordinal: usize, vector: Vec<f32>) {
        self.entries.push(Entry { ordinal, vector });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns up to `top_k` `(ordinal, score)` pairs for entries whose
    /// cosine similarity to `query` is at least `min_score`, ordered by
    /// descending score. Ties keep insertion order (ordinal ascending).
    pub fn nearest(&self, query: &[f32], top_k: usize, min_score: f64) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .map(|e| (e.ordinal, cosine_similarity(query, &e.vector)))
            .filter(|(_, score)| *score >= min_score)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_has_similarity_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn nearest_orders_by_descending_score_and_respects_top_k() {
        let mut base = VectorBase::new();
        base.add(0, vec![1.0, 0.0]);
        base.add(1, vec![0.0, 1.0]);
        base.add(2, vec![0.9, 0.1]);
        let results = base.nearest(&[1.0, 0.0], 2, 0.0);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
    }

    #[test]
    fn min_score_filters_out_dissimilar_entries() {
        let mut base = VectorBase::new();
        base.add(0, vec![1.0, 0.0]);
        base.add(1, vec![0.0, 1.0]);
        let results = base.nearest(&[1.0, 0.0], 10, 0.5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 0);
    }
}
