//! End-to-end scenarios S1-S6 (spec.md §8) exercised against the façade
//! with the deterministic test embedding/LLM clients.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use km_conversation::Conversation;
use km_core::{Action, ConcreteEntity, Facet, KnowledgeResponse, Message, Value, VerbTense, NONE_ENTITY_NAME};
use km_embedding::DeterministicTestEmbeddingClient;
use km_index::PropertyName;
use km_pipeline::PipelineSettings;

fn settings() -> PipelineSettings {
    PipelineSettings { auto_extract_knowledge: false, embedding_batch_size: 16 }
}

fn client() -> Arc<DeterministicTestEmbeddingClient> {
    Arc::new(DeterministicTestEmbeddingClient::default())
}

/// S1: empty conversation round-trips through a snapshot with every size
/// at zero.
#[tokio::test]
async fn s1_empty_conversation_round_trips() {
    let conversation = Conversation::new_in_memory("empty", vec![], client(), 16, settings());
    assert_eq!(conversation.message_count().await.unwrap(), 0);
    assert_eq!(conversation.semantic_ref_count().await.unwrap(), 0);

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("empty");
    conversation.to_snapshot(&prefix).await.unwrap();

    let restored = Conversation::from_snapshot(&prefix, client(), 16, settings()).await.unwrap();
    assert_eq!(restored.name_tag(), "empty");
    assert_eq!(restored.message_count().await.unwrap(), 0);
    assert_eq!(restored.semantic_ref_count().await.unwrap(), 0);
}

/// S2: a single message with only intrinsic (authored) knowledge —
/// speaker Alice, listener Bob, text "hello" — yields the expected
/// entities and a "say" action, and the speaker is term-findable.
#[tokio::test]
async fn s2_single_message_intrinsic_only() {
    let mut conversation = Conversation::new_in_memory("podcast", vec![], client(), 16, settings());

    let knowledge = KnowledgeResponse {
        entities: vec![
            ConcreteEntity::new("Alice", vec!["person".to_string()]).unwrap(),
            ConcreteEntity::new("Bob", vec!["person".to_string()]).unwrap(),
        ],
        actions: vec![Action::new(vec!["say".to_string()], VerbTense::Present, "Alice", "Bob", NONE_ENTITY_NAME).unwrap()],
        inverse_actions: Vec::new(),
        topics: Vec::new(),
    };
    let message = Message::new(vec!["hello".to_string()]).unwrap().with_knowledge(knowledge);
    conversation.add_message(message).await.unwrap();

    let results = conversation.build_index_to_completion().await.unwrap();
    assert_eq!(results.semantic_refs.number_completed, 3);

    let alice = conversation.lookup_term("alice").await.unwrap();
    assert_eq!(alice.len(), 1);
}

/// S3: two messages at distinct timestamps. A half-open range excludes
/// the second; a point query at the second's exact timestamp returns
/// only it.
#[tokio::test]
async fn s3_timestamp_half_open_and_point_queries() {
    let mut conversation = Conversation::new_in_memory("timed", vec![], client(), 16, settings());
    conversation.add_message(Message::new(vec!["first".to_string()]).unwrap().with_timestamp("2025-01-01T00:00:00Z")).await.unwrap();
    conversation.add_message(Message::new(vec!["second".to_string()]).unwrap().with_timestamp("2025-01-01T01:00:00Z")).await.unwrap();
    conversation.build_index_to_completion().await.unwrap();

    let t0: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();
    let t1: DateTime<Utc> = "2025-01-01T01:00:00Z".parse().unwrap();

    let first_only = conversation.lookup_timestamp_range(t0, Some(t1)).await.unwrap();
    assert_eq!(first_only.len(), 1);
    assert_eq!(first_only[0].range.start.message_ordinal, 0);

    let point_at_second = conversation.lookup_timestamp_range(t1, None).await.unwrap();
    assert_eq!(point_at_second.len(), 1);
    assert_eq!(point_at_second[0].range.start.message_ordinal, 1);
}

/// S4: an entity with a facet is reachable both by its type and by its
/// facet value.
#[tokio::test]
async fn s4_property_lookup_by_type_and_facet_value() {
    let mut conversation = Conversation::new_in_memory("facets", vec![], client(), 16, settings());
    let entity = ConcreteEntity::new("John Doe", vec!["person".to_string(), "speaker".to_string()])
        .unwrap()
        .with_facets(vec![Facet { name: "role".to_string(), value: Value::from("host") }]);
    let knowledge = KnowledgeResponse { entities: vec![entity], actions: Vec::new(), inverse_actions: Vec::new(), topics: Vec::new() };
    conversation.add_message(Message::new(vec!["intro".to_string()]).unwrap().with_knowledge(knowledge)).await.unwrap();
    conversation.build_index_to_completion().await.unwrap();

    let by_type = conversation.lookup_property(PropertyName::Type, "person").await.unwrap().unwrap();
    assert_eq!(by_type.len(), 1);

    let by_facet_value = conversation.lookup_property(PropertyName::FacetValue, "host").await.unwrap().unwrap();
    assert_eq!(by_facet_value, by_type);
}

/// S5: the same text embedded across two messages; a text lookup
/// returns at most two message ordinals, higher-scoring first.
#[tokio::test]
async fn s5_embedding_top_k_over_messages() {
    let mut conversation = Conversation::new_in_memory("topics", vec![], client(), 16, settings());
    conversation.add_message(Message::new(vec!["python programming".to_string(), "python programming".to_string()]).unwrap()).await.unwrap();
    conversation.add_message(Message::new(vec!["python programming".to_string()]).unwrap()).await.unwrap();
    conversation.build_index_to_completion().await.unwrap();

    let hits = conversation.lookup_messages("python programming", 2, 0.0).await.unwrap();
    assert!(hits.len() <= 2);
    assert!(hits[0].score >= hits.last().unwrap().score);
}

/// S6: building an index over 3 messages, then appending 2 more and
/// rebuilding, extends the original ordinals rather than recomputing
/// them — and matches a from-scratch build over all 5.
#[tokio::test]
async fn s6_incremental_rebuild_matches_full_rebuild() {
    let mut incremental = Conversation::new_in_memory("incremental", vec![], client(), 16, settings());
    for i in 0..3 {
        incremental.add_message(Message::new(vec![format!("msg {i}")]).unwrap()).await.unwrap();
    }
    let first = incremental.build_index_to_completion().await.unwrap();
    assert_eq!(first.indexed_upto, 3);

    for i in 3..5 {
        incremental.add_message(Message::new(vec![format!("msg {i}")]).unwrap()).await.unwrap();
    }
    let second = incremental.build_index_to_completion().await.unwrap();
    assert_eq!(second.indexed_upto, 5);

    let mut from_scratch = Conversation::new_in_memory("from-scratch", vec![], client(), 16, settings());
    for i in 0..5 {
        from_scratch.add_message(Message::new(vec![format!("msg {i}")]).unwrap()).await.unwrap();
    }
    from_scratch.build_index_to_completion().await.unwrap();

    assert_eq!(incremental.semantic_ref_count().await.unwrap(), from_scratch.semantic_ref_count().await.unwrap());
    assert_eq!(incremental.message_count().await.unwrap(), from_scratch.message_count().await.unwrap());
}
