//! Provider parity (spec.md §4.9, Testable Property 7): for identical
//! inputs, the in-memory and relational backends must agree on every
//! read operation, modulo documented ordering.

use std::sync::Arc;

use km_core::{Action, ConcreteEntity, Facet, KnowledgeResponse, Message, Value, VerbTense, NONE_ENTITY_NAME};
use km_embedding::DeterministicTestEmbeddingClient;
use km_index::PropertyName;
use km_pipeline::{build_index, NullEventHandlers, PipelineSettings};
use km_storage::StorageProvider;
use km_storage_memory::InMemoryStorageProvider;
use km_storage_sqlite::SqliteStorageProvider;

async fn populated<P: StorageProvider>(provider: &P) {
    let knowledge = KnowledgeResponse {
        entities: vec![
            ConcreteEntity::new("Alice", vec!["person".to_string()])
                .unwrap()
                .with_facets(vec![Facet { name: "role".to_string(), value: Value::from("host") }]),
            ConcreteEntity::new("Bob", vec!["person".to_string()]).unwrap(),
        ],
        actions: vec![Action::new(vec!["say".to_string()], VerbTense::Present, "Alice", "Bob", NONE_ENTITY_NAME).unwrap()],
        inverse_actions: Vec::new(),
        topics: Vec::new(),
    };
    let messages = vec![
        Message::new(vec!["hello Bob".to_string()]).unwrap().with_knowledge(knowledge).with_timestamp("2025-01-01T00:00:00Z").with_tags(vec!["greeting".to_string()]),
        Message::new(vec!["python programming".to_string()]).unwrap().with_timestamp("2025-01-01T01:00:00Z"),
    ];
    provider.get_message_collection().extend(messages).await.unwrap();

    let settings = PipelineSettings { auto_extract_knowledge: false, embedding_batch_size: 16 };
    build_index(provider, None, &settings, 0, &NullEventHandlers).await.unwrap();
}

#[tokio::test]
async fn in_memory_and_sqlite_providers_agree_on_every_read() {
    let client = Arc::new(DeterministicTestEmbeddingClient::default());

    let memory = InMemoryStorageProvider::new(client.clone());
    populated(&memory).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("parity.db");
    let sqlite = SqliteStorageProvider::new(db_path.to_str().unwrap(), client).await.unwrap();
    populated(&sqlite).await;

    assert_eq!(memory.get_message_collection().size().await.unwrap(), sqlite.get_message_collection().size().await.unwrap());
    assert_eq!(memory.get_semantic_ref_collection().size().await.unwrap(), sqlite.get_semantic_ref_collection().size().await.unwrap());

    let memory_alice = memory.get_term_index().lookup_term("alice").await.unwrap();
    let sqlite_alice = sqlite.get_term_index().lookup_term("alice").await.unwrap();
    assert_eq!(memory_alice.len(), sqlite_alice.len());
    assert_eq!(memory_alice[0].semantic_ref_ordinal, sqlite_alice[0].semantic_ref_ordinal);

    let memory_hosts = memory.get_property_index().lookup_property(PropertyName::FacetValue, "host").await.unwrap();
    let sqlite_hosts = sqlite.get_property_index().lookup_property(PropertyName::FacetValue, "host").await.unwrap();
    assert_eq!(memory_hosts, sqlite_hosts);

    let memory_people = memory.get_property_index().lookup_property(PropertyName::Type, "person").await.unwrap().unwrap();
    let sqlite_people = sqlite.get_property_index().lookup_property(PropertyName::Type, "person").await.unwrap().unwrap();
    assert_eq!(memory_people.len(), sqlite_people.len());
    assert_eq!(memory_people.len(), 2);

    let start = "2025-01-01T00:00:00Z".parse().unwrap();
    let end = "2025-01-01T01:00:00Z".parse().unwrap();
    let memory_range = memory.get_timestamp_index().lookup_range(km_index::DateRange::new(start, Some(end))).await.unwrap();
    let sqlite_range = sqlite.get_timestamp_index().lookup_range(km_index::DateRange::new(start, Some(end))).await.unwrap();
    assert_eq!(memory_range.len(), 1);
    assert_eq!(memory_range.len(), sqlite_range.len());
    assert_eq!(memory_range[0].range, sqlite_range[0].range);

    let memory_msgs = memory.get_message_text_index().lookup_messages("python", 5, 0.0).await.unwrap();
    let sqlite_msgs = sqlite.get_message_text_index().lookup_messages("python", 5, 0.0).await.unwrap();
    assert_eq!(memory_msgs.len(), sqlite_msgs.len());
    assert_eq!(memory_msgs[0].message_ordinal, sqlite_msgs[0].message_ordinal);

    memory.close().await.unwrap();
    sqlite.close().await.unwrap();
}
