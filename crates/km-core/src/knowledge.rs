//! Entities, actions, topics and tags — the four knowledge variants a
//! message can yield, and the closed `Knowledge` union over them.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::{Facet, Value};

/// Sentinel used in place of an entity name for an action role that has
/// no subject/object/indirect object.
pub const NONE_ENTITY_NAME: &str = "none";

/// A specific, tangible noun: a person, place, institution or thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcreteEntity {
    pub name: String,
    /// Single-word type labels, e.g. `["person", "speaker"]`. Never empty.
    #[serde(rename = "type")]
    pub entity_type: Vec<String>,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

impl ConcreteEntity {
    pub fn new(name: impl Into<String>, entity_type: Vec<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if entity_type.is_empty() {
            return Err(ValidationError::EntityMissingType { name });
        }
        Ok(Self { name, entity_type, facets: Vec::new() })
    }

    pub fn with_facets(mut self, facets: Vec<Facet>) -> Self {
        self.facets = facets;
        self
    }
}

/// Tense of an action's verb(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbTense {
    Past,
    Present,
    Future,
}

/// A named parameter of an action, e.g. `("destination", "Seattle")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParam {
    pub name: String,
    pub value: Value,
}

/// A single parameter to an action: either a bare name or a name/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Name(String),
    Named(ActionParam),
}

impl Param {
    /// The name contributed to the term index (see spec.md §4.8 step 4).
    pub fn name(&self) -> &str {
        match self {
            Param::Name(n) => n,
            Param::Named(p) => &p.name,
        }
    }
}

/// A verb phrase relating a subject to an object and/or indirect object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Never empty.
    pub verbs: Vec<String>,
    pub verb_tense: VerbTense,
    pub subject_entity_name: String,
    pub object_entity_name: String,
    pub indirect_object_entity_name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub subject_entity_facet: Option<Facet>,
}

impl Action {
    pub fn new(
        verbs: Vec<String>,
        verb_tense: VerbTense,
        subject_entity_name: impl Into<String>,
        object_entity_name: impl Into<String>,
        indirect_object_entity_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if verbs.is_empty() {
            return Err(ValidationError::ActionMissingVerb);
        }
        Ok(Self {
            verbs,
            verb_tense,
            subject_entity_name: subject_entity_name.into(),
            object_entity_name: object_entity_name.into(),
            indirect_object_entity_name: indirect_object_entity_name.into(),
            params: Vec::new(),
            subject_entity_facet: None,
        })
    }

    /// Verbs joined by a single space, the key form used by the term and
    /// property indexes (spec.md §4.2, §4.3).
    pub fn joined_verbs(&self) -> String {
        self.verbs.join(" ")
    }

    /// The non-`"none"` role names (subject/object/indirect object), in
    /// that order, for property indexing.
    pub fn role_names(&self) -> Vec<(&'static str, &str)> {
        let mut roles = Vec::with_capacity(3);
        if self.subject_entity_name != NONE_ENTITY_NAME {
            roles.push(("subject", self.subject_entity_name.as_str()));
        }
        if self.object_entity_name != NONE_ENTITY_NAME {
            roles.push(("object", self.object_entity_name.as_str()));
        }
        if self.indirect_object_entity_name != NONE_ENTITY_NAME {
            roles.push(("indirectObject", self.indirect_object_entity_name.as_str()));
        }
        roles
    }
}

/// A detailed, descriptive topic or keyword extracted from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub text: String,
}

/// A tag attached to a message or derived during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub text: String,
}

/// The discriminator stored alongside `Knowledge` on a `SemanticRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeType {
    Entity,
    Action,
    Topic,
    Tag,
}

/// The closed set of knowledge a message can yield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "knowledgeType", rename_all = "camelCase")]
pub enum Knowledge {
    Entity(ConcreteEntity),
    Action(Action),
    Topic(Topic),
    Tag(Tag),
}

impl Knowledge {
    pub fn knowledge_type(&self) -> KnowledgeType {
        match self {
            Knowledge::Entity(_) => KnowledgeType::Entity,
            Knowledge::Action(_) => KnowledgeType::Action,
            Knowledge::Topic(_) => KnowledgeType::Topic,
            Knowledge::Tag(_) => KnowledgeType::Tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_without_type_is_rejected() {
        let err = ConcreteEntity::new("Bach", vec![]).unwrap_err();
        assert_eq!(err, ValidationError::EntityMissingType { name: "Bach".to_string() });
    }

    #[test]
    fn action_without_verb_is_rejected() {
        let err = Action::new(vec![], VerbTense::Past, "Alice", "Bob", NONE_ENTITY_NAME).unwrap_err();
        assert_eq!(err, ValidationError::ActionMissingVerb);
    }

    #[test]
    fn role_names_skips_none() {
        let action = Action::new(
            vec!["say".to_string()],
            VerbTense::Present,
            "Alice",
            "Bob",
            NONE_ENTITY_NAME,
        )
        .unwrap();
        assert_eq!(action.role_names(), vec![("subject", "Alice"), ("object", "Bob")]);
    }

    #[test]
    fn joined_verbs_joins_with_single_space() {
        let action = Action::new(
            vec!["pick".to_string(), "up".to_string()],
            VerbTense::Past,
            "Alice",
            NONE_ENTITY_NAME,
            NONE_ENTITY_NAME,
        )
        .unwrap();
        assert_eq!(action.joined_verbs(), "pick up");
    }

    #[test]
    fn knowledge_type_matches_variant() {
        let topic = Knowledge::Topic(Topic { text: "weather".to_string() });
        assert_eq!(topic.knowledge_type(), KnowledgeType::Topic);
    }
}
