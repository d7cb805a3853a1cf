//! Related terms: an authored alias map plus a fuzzy embedding index over
//! term strings, exposed together as one union lookup.

use std::sync::Arc;

use indexmap::IndexMap;
use km_core::Term;
use km_embedding::{cosine_similarity, EmbeddingClient, EmbeddingError};
use serde::{Deserialize, Serialize};

use crate::term_text::normalize_term_text;

/// Authored exact aliases (nicknames, participant-derived alternate
/// spellings). Never mutated by the embedding pipeline.
#[derive(Debug, Clone, Default)]
pub struct AliasesIndex {
    aliases: IndexMap<String, Vec<Term>>,
}

impl AliasesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_related_term(&mut self, term: &str, related: Vec<Term>) {
        let key = normalize_term_text(term);
        let list = self.aliases.entry(key).or_default();
        for r in related {
            if !list.iter().any(|existing| existing.text == r.text) {
                list.push(r);
            }
        }
    }

    pub fn lookup_term(&self, term: &str) -> Option<Vec<Term>> {
        let key = normalize_term_text(term);
        self.aliases.get(&key).cloned()
    }

    pub fn remove_term(&mut self, term: &str) {
        self.aliases.shift_remove(&normalize_term_text(term));
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    pub fn size(&self) -> usize {
        self.aliases.len()
    }
}

/// The wire shape of `relatedTermsIndexData.aliasData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedTermsAliasEntry {
    term_text: String,
    related_terms: Vec<TermJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermJson {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasData {
    related_terms: Vec<RelatedTermsAliasEntry>,
}

impl AliasesIndex {
    pub fn serialize(&self) -> AliasData {
        AliasData {
            related_terms: self
                .aliases
                .iter()
                .map(|(term, related)| RelatedTermsAliasEntry {
                    term_text: term.clone(),
                    related_terms: related.iter().map(|t| TermJson { text: t.text.clone(), weight: t.weight }).collect(),
                })
                .collect(),
        }
    }

    pub fn deserialize(data: AliasData) -> Self {
        let mut aliases = IndexMap::new();
        for entry in data.related_terms {
            let terms = entry.related_terms.into_iter().map(|t| Term { text: t.text, weight: t.weight }).collect();
            aliases.insert(entry.term_text, terms);
        }
        Self { aliases }
    }
}

struct FuzzyEntry {
    text: String,
    embedding: Vec<f32>,
}

/// A fuzzy (embedding-backed) index over term strings themselves, used to
/// find near-synonyms of a term even when no alias was authored for it.
pub struct FuzzyIndex {
    client: Arc<dyn EmbeddingClient>,
    entries: Vec<FuzzyEntry>,
}

impl FuzzyIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { client, entries: Vec::new() }
    }

    /// Embeds and adds every term in `terms` not already present.
    pub async fn add_terms(&mut self, terms: &[String]) -> Result<(), EmbeddingError> {
        let to_embed: Vec<String> = terms.iter().map(|t| normalize_term_text(t)).filter(|t| !self.entries.iter().any(|e| e.text == *t)).collect();
        if to_embed.is_empty() {
            return Ok(());
        }
        let embeddings = self.client.embed_batch(&to_embed).await?;
        for (text, embedding) in to_embed.into_iter().zip(embeddings) {
            self.entries.push(FuzzyEntry { text, embedding });
        }
        Ok(())
    }

    pub async fn lookup_term(&self, text: &str, max_hits: usize, threshold: f64) -> Result<Vec<Term>, EmbeddingError> {
        let query = self.client.embed(text).await?;
        Ok(self.nearest(&query, max_hits, threshold))
    }

    pub async fn lookup_terms(&self, texts: &[String], max_hits: usize, threshold: f64) -> Result<Vec<Vec<Term>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.lookup_term(text, max_hits, threshold).await?);
        }
        Ok(out)
    }

    fn nearest(&self, query: &[f32], max_hits: usize, threshold: f64) -> Vec<Term> {
        let mut scored: Vec<(String, f64)> =
            self.entries.iter().map(|e| (e.text.clone(), cosine_similarity(query, &e.embedding))).filter(|(_, score)| *score >= threshold).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(max_hits);
        scored.into_iter().map(|(text, score)| Term { text, weight: Some(score) }).collect()
    }

    pub fn remove_term(&mut self, text: &str) {
        let key = normalize_term_text(text);
        self.entries.retain(|e| e.text != key);
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn serialize(&self) -> (Vec<String>, Vec<Vec<f32>>) {
        (self.entries.iter().map(|e| e.text.clone()).collect(), self.entries.iter().map(|e| e.embedding.clone()).collect())
    }

    pub fn deserialize(client: Arc<dyn EmbeddingClient>, texts: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self, crate::error::DeserializationError> {
        if texts.len() != vectors.len() {
            return Err(crate::error::DeserializationError::EmbeddingSidecarLengthMismatch { expected: texts.len(), got: vectors.len() });
        }
        let entries = texts.into_iter().zip(vectors).map(|(text, embedding)| FuzzyEntry { text, embedding }).collect();
        Ok(Self { client, entries })
    }
}

/// Aliases and fuzzy lookup combined into the one "related terms of X"
/// contract spec.md §4.6 describes: aliases are consulted first, fuzzy
/// results augment them, duplicates (by text) collapse with the alias
/// entry winning ties.
pub struct RelatedTermsIndex {
    pub aliases: AliasesIndex,
    pub fuzzy: FuzzyIndex,
}

impl RelatedTermsIndex {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { aliases: AliasesIndex::new(), fuzzy: FuzzyIndex::new(client) }
    }

    pub async fn lookup_related(&self, term: &str, max_hits: usize, threshold: f64) -> Result<Vec<Term>, EmbeddingError> {
        let mut combined: Vec<Term> = self.aliases.lookup_term(term).unwrap_or_default();
        let fuzzy = self.fuzzy.lookup_term(term, max_hits, threshold).await?;
        for term in fuzzy {
            if !combined.iter().any(|existing| existing.text == term.text) {
                combined.push(term);
            }
        }
        combined.truncate(max_hits);
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_embedding::DeterministicTestEmbeddingClient;

    fn client() -> Arc<dyn EmbeddingClient> {
        Arc::new(DeterministicTestEmbeddingClient::default())
    }

    #[test]
    fn aliases_lookup_case_insensitive() {
        let mut aliases = AliasesIndex::new();
        aliases.add_related_term("Bob", vec![Term::new("Bobby")]);
        assert_eq!(aliases.lookup_term("bob"), Some(vec![Term::new("Bobby")]));
    }

    #[test]
    fn aliases_lookup_missing_is_none() {
        let aliases = AliasesIndex::new();
        assert_eq!(aliases.lookup_term("nobody"), None);
    }

    #[test]
    fn aliases_dedupe_by_text() {
        let mut aliases = AliasesIndex::new();
        aliases.add_related_term("bob", vec![Term::new("bobby")]);
        aliases.add_related_term("bob", vec![Term::new("bobby"), Term::new("rob")]);
        assert_eq!(aliases.lookup_term("bob").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fuzzy_lookup_orders_by_similarity() {
        let mut fuzzy = FuzzyIndex::new(client());
        fuzzy.add_terms(&["python".to_string(), "snake".to_string(), "umbrella".to_string()]).await.unwrap();
        let results = fuzzy.lookup_term("python", 3, 0.0).await.unwrap();
        assert_eq!(results[0].text, "python");
    }

    #[tokio::test]
    async fn related_union_prefers_alias_on_duplicate() {
        let mut index = RelatedTermsIndex::new(client());
        index.aliases.add_related_term("bob", vec![Term::new("a")]);
        index.fuzzy.add_terms(&["a".to_string(), "b".to_string()]).await.unwrap();
        let combined = index.lookup_related("bob", 10, -1.0).await.unwrap();
        let texts: Vec<&str> = combined.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts[0], "a");
        assert!(texts.contains(&"b"));
        assert_eq!(combined.iter().filter(|t| t.text == "a").count(), 1);
    }

    #[tokio::test]
    async fn related_union_with_no_alias_falls_back_to_fuzzy() {
        let mut index = RelatedTermsIndex::new(client());
        index.fuzzy.add_terms(&["python".to_string()]).await.unwrap();
        let combined = index.lookup_related("python", 10, 0.0).await.unwrap();
        assert_eq!(combined[0].text, "python");
    }
}
