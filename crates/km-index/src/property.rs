//! The property→semantic-ref index: `(propertyName, value)` pairs over a
//! closed set of property names, encoded as a single string key so the
//! storage backends can treat it as an ordinary term index underneath.

use indexmap::IndexMap;
use km_core::{Action, ConcreteEntity, ScoredSemanticRef, Tag};

use crate::term_text::normalize_term_text;

/// The closed set of property names the index accepts (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyName {
    Name,
    Type,
    Verb,
    Subject,
    Object,
    IndirectObject,
    Tag,
    FacetName,
    FacetValue,
}

impl PropertyName {
    fn as_str(self) -> &'static str {
        match self {
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

    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "name" => PropertyName::Name,
            "type" => PropertyName::Type,
            "verb" => PropertyName::Verb,
            "subject" => PropertyName::Subject,
            "object" => PropertyName::Object,
            "indirectobject" => PropertyName::IndirectObject,
            "tag" => PropertyName::Tag,
            "facet.name" => PropertyName::FacetName,
            "facet.value" => PropertyName::FacetValue,
            _ => return None,
        })
    }
}

const SEPARATOR: &str = "@@";

/// Encodes `(name, value)` into the single string key stored by
/// `PropertyIndex` and the relational `PropertyIndex` table's
/// `prop_name`/`prop_value` pair conceptually collapse to this same key
/// for the in-memory backend. Both halves are case-folded.
pub fn make_property_term_text(name: PropertyName, value: &str) -> String {
    format!("prop.{}{}{}", name.as_str().to_lowercase(), SEPARATOR, normalize_term_text(value))
}

/// Inverse of [`make_property_term_text`]. Returns `None` if `key` is not
/// a well-formed property key (wrong prefix, missing separator, or an
/// unrecognized property name).
pub fn split_property_term_text(key: &str) -> Option<(PropertyName, String)> {
    let rest = key.strip_prefix("prop.")?;
    let (name, value) = rest.split_once(SEPARATOR)?;
    let name = PropertyName::from_str(name)?;
    Some((name, value.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Posting {
    semantic_ref_ordinal: usize,
}

/// `(propertyName, value)` → list of semantic refs, keyed internally by
/// [`make_property_term_text`].
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    postings: IndexMap<String, Vec<Posting>>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(&mut self, name: PropertyName, value: &str, ordinal: usize) {
        let key = make_property_term_text(name, value);
        let list = self.postings.entry(key).or_default();
        if !list.iter().any(|p| p.semantic_ref_ordinal == ordinal) {
            list.push(Posting { semantic_ref_ordinal: ordinal });
        }
    }

    pub fn remove_property(&mut self, name: PropertyName, value: &str, ordinal: usize) {
        let key = make_property_term_text(name, value);
        if let Some(list) = self.postings.get_mut(&key) {
            list.retain(|p| p.semantic_ref_ordinal != ordinal);
        }
    }

    /// Strips `ordinal` out of every property entry, used when a
    /// semantic ref is retracted.
    pub fn remove_all_for_semref(&mut self, ordinal: usize) {
        for list in self.postings.values_mut() {
            list.retain(|p| p.semantic_ref_ordinal != ordinal);
        }
    }

    /// `None` iff the key has never been seen; `Some(empty)` iff the key
    /// existed but every reference to it has since been removed.
    pub fn lookup_property(&self, name: PropertyName, value: &str) -> Option<Vec<ScoredSemanticRef>> {
        let key = make_property_term_text(name, value);
        self.postings
            .get(&key)
            .map(|list| list.iter().map(|p| ScoredSemanticRef::new(p.semantic_ref_ordinal, 1.0)).collect())
    }

    pub fn size(&self) -> usize {
        self.postings.len()
    }

    pub fn clear(&mut self) {
        self.postings.clear();
    }

    /// Adds every property entry an entity contributes (spec.md §4.3):
    /// one `(type, name)` per type word, one `(name, entity.name)`, and
    /// one `(facet.name, facet.name)` / `(facet.value, str(facet.value))`
    /// pair per facet.
    pub fn add_entity(&mut self, entity: &ConcreteEntity, ordinal: usize) {
        for (name, value) in entity_properties(entity) {
            self.add_property(name, &value, ordinal);
        }
    }

    /// Adds every property entry an action contributes: `(verb,
    /// joined_verbs)` and one entry per non-`"none"` role.
    pub fn add_action(&mut self, action: &Action, ordinal: usize) {
        for (name, value) in action_properties(action) {
            self.add_property(name, &value, ordinal);
        }
    }

    /// Adds the `(tag, text)` entry a tag contributes. Topics are not
    /// property-indexed.
    pub fn add_tag(&mut self, tag: &Tag, ordinal: usize) {
        for (name, value) in tag_properties(tag) {
            self.add_property(name, &value, ordinal);
        }
    }
}

/// The `(propertyName, value)` pairs an entity contributes, independent of
/// any particular index instance — shared by `PropertyIndex::add_entity`
/// and by `km-pipeline`, which writes through the async
/// `PropertyIndexProvider` trait instead of this in-memory type.
pub fn entity_properties(entity: &ConcreteEntity) -> Vec<(PropertyName, String)> {
    let mut out = Vec::with_capacity(entity.entity_type.len() * 1 + 1 + entity.facets.len() * 2);
    for t in &entity.entity_type {
        out.push((PropertyName::Type, t.clone()));
    }
    out.push((PropertyName::Name, entity.name.clone()));
    for facet in &entity.facets {
        out.push((PropertyName::FacetName, facet.name.clone()));
        out.push((PropertyName::FacetValue, facet.value.as_display_string()));
    }
    out
}

/// The `(propertyName, value)` pairs an action contributes.
pub fn action_properties(action: &Action) -> Vec<(PropertyName, String)> {
    let mut out = vec![(PropertyName::Verb, action.joined_verbs())];
    for (role, name) in action.role_names() {
        let role_name = match role {
            "subject" => PropertyName::Subject,
            "object" => PropertyName::Object,
            "indirectObject" => PropertyName::IndirectObject,
            _ => unreachable!("Action::role_names only yields subject/object/indirectObject"),
        };
        out.push((role_name, name.to_string()));
    }
    out
}

/// The `(propertyName, value)` pair a tag contributes. Topics contribute
/// none — they are not property-indexed.
pub fn tag_properties(tag: &Tag) -> Vec<(PropertyName, String)> {
    vec![(PropertyName::Tag, tag.text.clone())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use km_core::{Facet, Value};

    #[test]
    fn make_and_split_are_inverses() {
        for (name, value) in [
            (PropertyName::Name, "John Doe"),
            (PropertyName::FacetValue, "host"),
            (PropertyName::Tag, "funny @@ moment"),
            (PropertyName::IndirectObject, "Bob"),
        ] {
            let key = make_property_term_text(name, value);
            let (split_name, split_value) = split_property_term_text(&key).unwrap();
            assert_eq!(split_name, name);
            assert_eq!(split_value, normalize_term_text(value));
        }
    }

    #[test]
    fn split_rejects_malformed_key() {
        assert!(split_property_term_text("not-a-property-key").is_none());
        assert!(split_property_term_text("prop.bogus@@value").is_none());
    }

    #[test]
    fn lookup_distinguishes_never_seen_from_emptied() {
        let mut index = PropertyIndex::new();
        assert!(index.lookup_property(PropertyName::Tag, "funny").is_none());
        index.add_property(PropertyName::Tag, "funny", 0);
        index.remove_property(PropertyName::Tag, "funny", 0);
        assert_eq!(index.lookup_property(PropertyName::Tag, "funny"), Some(vec![]));
    }

    #[test]
    fn add_entity_contributes_type_name_and_facets() {
        let mut index = PropertyIndex::new();
        let entity = ConcreteEntity::new("John Doe", vec!["person".to_string(), "speaker".to_string()])
            .unwrap()
            .with_facets(vec![Facet { name: "role".to_string(), value: Value::from("host") }]);
        index.add_entity(&entity, 7);
        assert_eq!(index.lookup_property(PropertyName::Type, "person").unwrap(), vec![ScoredSemanticRef::new(7, 1.0)]);
        assert_eq!(index.lookup_property(PropertyName::Name, "John Doe").unwrap().len(), 1);
        assert_eq!(index.lookup_property(PropertyName::FacetValue, "host").unwrap().len(), 1);
    }

    #[test]
    fn add_action_skips_none_roles() {
        let mut index = PropertyIndex::new();
        let action = Action::new(vec!["say".to_string()], km_core::VerbTense::Present, "Alice", "Bob", km_core::NONE_ENTITY_NAME).unwrap();
        index.add_action(&action, 2);
        assert_eq!(index.lookup_property(PropertyName::Subject, "Alice").unwrap().len(), 1);
        assert_eq!(index.lookup_property(PropertyName::Object, "Bob").unwrap().len(), 1);
        assert!(index.lookup_property(PropertyName::IndirectObject, "anything").is_none());
    }

    #[test]
    fn remove_all_for_semref_clears_every_property() {
        let mut index = PropertyIndex::new();
        index.add_property(PropertyName::Tag, "funny", 3);
        index.add_property(PropertyName::Name, "Alice", 3);
        index.remove_all_for_semref(3);
        assert_eq!(index.lookup_property(PropertyName::Tag, "funny"), Some(vec![]));
        assert_eq!(index.lookup_property(PropertyName::Name, "Alice"), Some(vec![]));
    }
}
