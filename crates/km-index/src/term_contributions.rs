//! The term strings each knowledge variant contributes to the primary
//! term index (spec.md §4.8 step 4), as pure functions independent of any
//! particular index instance — used by `km-pipeline`, which writes
//! through the async `TermIndexProvider` trait rather than the in-memory
//! `TermToSemanticRefIndex` directly.

use km_core::{Action, ConcreteEntity, Tag, Topic, NONE_ENTITY_NAME};

/// An entity's name, each type word, and each facet name.
pub fn entity_terms(entity: &ConcreteEntity) -> Vec<String> {
    let mut out = Vec::with_capacity(1 + entity.entity_type.len() + entity.facets.len());
    out.push(entity.name.clone());
    out.extend(entity.entity_type.iter().cloned());
    out.extend(entity.facets.iter().map(|f| f.name.clone()));
    out
}

/// An action's joined verbs, its subject and object names (not the
/// indirect object — spec.md §4.8 step 4 omits it here even though the
/// property index does carry it), and every param name.
pub fn action_terms(action: &Action) -> Vec<String> {
    let mut out = vec![action.joined_verbs()];
    if action.subject_entity_name != NONE_ENTITY_NAME {
        out.push(action.subject_entity_name.clone());
    }
    if action.object_entity_name != NONE_ENTITY_NAME {
        out.push(action.object_entity_name.clone());
    }
    out.extend(action.params.iter().map(|p| p.name().to_string()));
    out
}

/// A topic's own text.
pub fn topic_terms(topic: &Topic) -> Vec<String> {
    vec![topic.text.clone()]
}

/// A tag's own text.
pub fn tag_terms(tag: &Tag) -> Vec<String> {
    vec![tag.text.clone()]
}
