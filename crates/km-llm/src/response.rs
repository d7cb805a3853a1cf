//! Parsing and validating the JSON an extraction client returns.

use km_core::{KnowledgeResponse, ValidationError};

use crate::error::ExtractionError;

/// Parses `raw` as a [`KnowledgeResponse`] and validates every entity and
/// action it contains, the way constructing them through `ConcreteEntity::new`
/// / `Action::new` would.
///
/// Extraction clients return a single JSON object; this does not attempt
/// to recover partial results from malformed JSON, matching the
/// all-or-nothing contract `km-pipeline`'s retry loop expects.
pub fn parse_knowledge_response(raw: &str) -> Result<KnowledgeResponse, ExtractionError> {
    let response: KnowledgeResponse =
        serde_json::from_str(raw).map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;
    validate(&response)?;
    Ok(response)
}

fn validate(response: &KnowledgeResponse) -> Result<(), ValidationError> {
    for entity in &response.entities {
        if entity.entity_type.is_empty() {
            return Err(ValidationError::EntityMissingType { name: entity.name.clone() });
        }
    }
    for action in response.actions.iter().chain(response.inverse_actions.iter()) {
        if action.verbs.is_empty() {
            return Err(ValidationError::ActionMissingVerb);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let raw = r#"{
            "entities": [{"name": "Bach", "type": ["person"], "facets": []}],
            "actions": [],
            "topics": [{"text": "music"}]
        }"#;
        let response = parse_knowledge_response(raw).unwrap();
        assert_eq!(response.entities.len(), 1);
        assert_eq!(response.topics.len(), 1);
    }

    #[test]
    fn rejects_entity_with_no_type() {
        let raw = r#"{"entities": [{"name": "Bach", "type": [], "facets": []}], "actions": [], "topics": []}"#;
        let err = parse_knowledge_response(raw).unwrap_err();
        assert!(matches!(err, ExtractionError::Validation(ValidationError::EntityMissingType { .. })));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_knowledge_response("not json").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse(_)));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let response = parse_knowledge_response("{}").unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn rejects_inverse_action_with_no_verb() {
        let raw = r#"{"inverseActions": [{"verbs": [], "verbTense": "past", "subjectEntityName": "none", "objectEntityName": "none", "indirectObjectEntityName": "none"}]}"#;
        let err = parse_knowledge_response(raw).unwrap_err();
        assert!(matches!(err, ExtractionError::Validation(ValidationError::ActionMissingVerb)));
    }
}
