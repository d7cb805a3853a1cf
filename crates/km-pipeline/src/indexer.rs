//! The single-pass indexing build (spec.md §4.8): derive knowledge for
//! each message in ordinal order, turn it into semantic refs, populate
//! the term/property/timestamp indexes eagerly, and flush embeddings in
//! batches to the message-text and fuzzy related-terms indexes.

use std::collections::HashSet;

use km_core::{Knowledge, KnowledgeResponse, KnowledgeSource, Message, SemanticRef, Tag, TextLocation, TextRange};
use km_index::{action_properties, action_terms, entity_properties, entity_terms, tag_properties, tag_terms, topic_terms};
use km_llm::{with_retry, LlmClient};
use km_storage::{MessageTextIndexProvider, RelatedTermsIndexProvider, StorageProvider};

use crate::error::IndexingError;
use crate::events::IndexingEventHandlers;
use crate::results::IndexingResults;
use crate::settings::PipelineSettings;

/// The range a message's knowledge is anchored to: every chunk of the
/// message, addressed `[(message_ordinal, 0), (message_ordinal,
/// chunk_count))` per spec.md §4.8 step 3.
fn message_range(message: &Message, message_ordinal: usize) -> TextRange {
    let chunk_count = message.text_chunks().len();
    TextRange::new(TextLocation::at_chunk(message_ordinal, 0), Some(TextLocation::at_chunk(message_ordinal, chunk_count)))
}

/// Runs (or resumes) a build over `provider`'s message collection,
/// processing every message with ordinal `>= start_ordinal`. Pass the
/// previous run's [`IndexingResults::indexed_upto`] back in as
/// `start_ordinal` to extend an existing index incrementally; pass `0`
/// to build from scratch.
///
/// `llm_client` is consulted only when `settings.auto_extract_knowledge`
/// is set; a `None` client with the flag set simply skips LLM extraction
/// for every message, falling back to intrinsic knowledge alone.
pub async fn build_index(
    provider: &dyn StorageProvider,
    llm_client: Option<&dyn LlmClient>,
    settings: &PipelineSettings,
    start_ordinal: usize,
    handlers: &dyn IndexingEventHandlers,
) -> Result<IndexingResults, IndexingError> {
    let messages = provider.get_message_collection();
    let semantic_refs = provider.get_semantic_ref_collection();
    let term_index = provider.get_term_index();
    let property_index = provider.get_property_index();
    let timestamp_index = provider.get_timestamp_index();
    let message_text_index = provider.get_message_text_index();
    let related_terms_index = provider.get_related_terms_index();

    let total = messages.size().await?;
    let mut results = IndexingResults { indexed_upto: start_ordinal, ..Default::default() };

    let mut pending_start: Option<usize> = None;
    let mut pending_messages: Vec<Message> = Vec::new();
    let mut pending_terms: HashSet<String> = HashSet::new();

    for ordinal in start_ordinal..total {
        if !handlers.on_message_started(ordinal) {
            break;
        }
        let Some(message) = messages.get_item(ordinal).await? else {
            continue;
        };

        let intrinsic = message.get_knowledge().unwrap_or_default();
        let mut extraction_attempted = false;
        let mut extraction_ok = true;
        let extracted = if let (true, Some(llm)) = (settings.auto_extract_knowledge, llm_client) {
            extraction_attempted = true;
            let text = message.full_text();
            match with_retry(|| llm.extract_knowledge(&text)).await {
                Ok(response) => response,
                Err(e) => {
                    extraction_ok = false;
                    results.semantic_refs.error = Some(e.to_string());
                    KnowledgeResponse::default()
                }
            }
        } else {
            KnowledgeResponse::default()
        };

        if extraction_attempted && !handlers.on_knowledge_extracted(ordinal, extraction_ok) {
            break;
        }

        let range = message_range(&message, ordinal);
        let mut new_terms = Vec::new();

        for entity in intrinsic.entities.iter().chain(extracted.entities.iter()) {
            let sr_ordinal = semantic_refs.append(SemanticRef::new(0, range, Knowledge::Entity(entity.clone()))).await?;
            for term in entity_terms(entity) {
                term_index.add_term(&term, sr_ordinal, None).await?;
                new_terms.push(term);
            }
            for (name, value) in entity_properties(entity) {
                property_index.add_property(name, &value, sr_ordinal).await?;
            }
            results.semantic_refs.number_completed += 1;
            results.secondary_index_results.properties.number_completed += 1;
        }

        for action in intrinsic
            .actions
            .iter()
            .chain(extracted.actions.iter())
            .chain(intrinsic.inverse_actions.iter())
            .chain(extracted.inverse_actions.iter())
        {
            let sr_ordinal = semantic_refs.append(SemanticRef::new(0, range, Knowledge::Action(action.clone()))).await?;
            for term in action_terms(action) {
                term_index.add_term(&term, sr_ordinal, None).await?;
                new_terms.push(term);
            }
            for (name, value) in action_properties(action) {
                property_index.add_property(name, &value, sr_ordinal).await?;
            }
            results.semantic_refs.number_completed += 1;
            results.secondary_index_results.properties.number_completed += 1;
        }

        for topic in intrinsic.topics.iter().chain(extracted.topics.iter()) {
            let sr_ordinal = semantic_refs.append(SemanticRef::new(0, range, Knowledge::Topic(topic.clone()))).await?;
            for term in topic_terms(topic) {
                term_index.add_term(&term, sr_ordinal, None).await?;
                new_terms.push(term);
            }
            results.semantic_refs.number_completed += 1;
        }

        for tag_text in &message.tags {
            let tag = Tag { text: tag_text.clone() };
            let sr_ordinal = semantic_refs.append(SemanticRef::new(0, range, Knowledge::Tag(tag.clone()))).await?;
            for term in tag_terms(&tag) {
                term_index.add_term(&term, sr_ordinal, None).await?;
                new_terms.push(term);
            }
            for (name, value) in tag_properties(&tag) {
                property_index.add_property(name, &value, sr_ordinal).await?;
            }
            results.semantic_refs.number_completed += 1;
            results.secondary_index_results.properties.number_completed += 1;
        }

        if let Some(timestamp) = &message.timestamp {
            timestamp_index.add_timestamp(ordinal, timestamp).await?;
            results.secondary_index_results.timestamps.number_completed += 1;
        }

        if pending_start.is_none() {
            pending_start = Some(ordinal);
        }
        pending_messages.push(message);
        pending_terms.extend(new_terms);

        if pending_messages.len() >= settings.embedding_batch_size {
            flush_pending(message_text_index.as_ref(), related_terms_index.as_ref(), &mut pending_start, &mut pending_messages, &mut pending_terms, &mut results)
                .await?;
            let last = results.indexed_upto.saturating_sub(1);
            if !handlers.on_embeddings_created(last) || !handlers.on_text_indexed(last) {
                return Ok(results);
            }
        }
    }

    flush_pending(message_text_index.as_ref(), related_terms_index.as_ref(), &mut pending_start, &mut pending_messages, &mut pending_terms, &mut results).await?;

    Ok(results)
}

/// Flushes whatever has accumulated since the last flush: embeds every
/// pending message's chunks into the message-text index and every newly
/// seen term into the fuzzy related-terms index, then advances
/// `results.indexed_upto` past them. A no-op when nothing is pending —
/// safe to call unconditionally at every exit point so a message's
/// semantic refs, term/property/timestamp postings and its embeddings
/// are never left split across the "indexed upto" mark.
async fn flush_pending(
    message_text_index: &dyn MessageTextIndexProvider,
    related_terms_index: &dyn RelatedTermsIndexProvider,
    pending_start: &mut Option<usize>,
    pending_messages: &mut Vec<Message>,
    pending_terms: &mut HashSet<String>,
    results: &mut IndexingResults,
) -> Result<(), IndexingError> {
    let Some(start) = pending_start.take() else {
        return Ok(());
    };
    let batch = std::mem::take(pending_messages);
    let terms: Vec<String> = pending_terms.drain().collect();

    with_retry(|| message_text_index.add_messages_starting_at(start, &batch)).await?;
    results.secondary_index_results.message.number_completed += batch.iter().map(|m| m.text_chunks.len()).sum::<usize>();

    if !terms.is_empty() {
        with_retry(|| related_terms_index.add_fuzzy_terms(&terms)).await?;
        results.secondary_index_results.related_terms.number_completed += terms.len();
    }

    results.indexed_upto = start + batch.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullEventHandlers;
    use km_core::{Action, ConcreteEntity, VerbTense, NONE_ENTITY_NAME};
    use km_embedding::DeterministicTestEmbeddingClient;
    use km_llm::DeterministicTestLlmClient;
    use km_storage_memory::InMemoryStorageProvider;
    use std::sync::Arc;

    fn provider() -> InMemoryStorageProvider {
        InMemoryStorageProvider::new(Arc::new(DeterministicTestEmbeddingClient::default()))
    }

    fn settings(batch_size: usize) -> PipelineSettings {
        PipelineSettings { auto_extract_knowledge: false, embedding_batch_size: batch_size }
    }

    #[tokio::test]
    async fn intrinsic_only_message_produces_ordered_semantic_refs() {
        let provider = provider();
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
        provider.get_message_collection().append(message).await.unwrap();

        let results = build_index(&provider, None, &settings(16), 0, &NullEventHandlers).await.unwrap();

        assert_eq!(results.semantic_refs.number_completed, 3);
        assert_eq!(results.indexed_upto, 1);
        let alice = provider.get_term_index().lookup_term("alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(provider.get_semantic_ref_collection().get_item(0).await.unwrap().unwrap().semantic_ref_ordinal, 0);
        assert!(matches!(provider.get_semantic_ref_collection().get_item(2).await.unwrap().unwrap().knowledge, Knowledge::Action(_)));
    }

    #[tokio::test]
    async fn llm_extraction_merges_with_intrinsic_knowledge() {
        let provider = provider();
        let message = Message::new(vec!["Carol visited".to_string()]).unwrap();
        provider.get_message_collection().append(message).await.unwrap();
        let llm = DeterministicTestLlmClient::new();

        let results = build_index(&provider, Some(&llm), &settings(16), 0, &NullEventHandlers).await.unwrap();

        assert!(results.semantic_refs.number_completed >= 2);
        let carol = provider.get_term_index().lookup_term("carol").await.unwrap();
        assert_eq!(carol.len(), 1);
    }

    #[tokio::test]
    async fn timestamp_is_indexed_when_present() {
        let provider = provider();
        let message = Message::new(vec!["hi".to_string()]).unwrap().with_timestamp("2025-01-01T00:00:00Z");
        provider.get_message_collection().append(message).await.unwrap();

        build_index(&provider, None, &settings(16), 0, &NullEventHandlers).await.unwrap();

        assert_eq!(provider.get_timestamp_index().size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embeddings_flush_at_batch_boundary_and_at_end() {
        let provider = provider();
        for i in 0..3 {
            provider.get_message_collection().append(Message::new(vec![format!("message {i}")]).unwrap()).await.unwrap();
        }

        let results = build_index(&provider, None, &settings(2), 0, &NullEventHandlers).await.unwrap();

        assert_eq!(results.indexed_upto, 3);
        assert_eq!(provider.get_message_text_index().size().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn incremental_rebuild_extends_prior_ordinals() {
        let provider = provider();
        for i in 0..3 {
            provider.get_message_collection().append(Message::new(vec![format!("msg {i}")]).unwrap()).await.unwrap();
        }
        let first = build_index(&provider, None, &settings(16), 0, &NullEventHandlers).await.unwrap();
        assert_eq!(first.indexed_upto, 3);

        for i in 3..5 {
            provider.get_message_collection().append(Message::new(vec![format!("msg {i}")]).unwrap()).await.unwrap();
        }
        let second = build_index(&provider, None, &settings(16), first.indexed_upto, &NullEventHandlers).await.unwrap();

        assert_eq!(second.indexed_upto, 5);
        assert_eq!(provider.get_message_text_index().size().await.unwrap(), 5);
    }

    struct AbortAfterFirstMessage;
    impl IndexingEventHandlers for AbortAfterFirstMessage {
        fn on_message_started(&self, message_ordinal: usize) -> bool {
            message_ordinal == 0
        }
    }

    #[tokio::test]
    async fn aborting_mid_run_leaves_indexed_upto_consistent_with_committed_rows() {
        let provider = provider();
        for i in 0..3 {
            provider.get_message_collection().append(Message::new(vec![format!("msg {i}")]).unwrap()).await.unwrap();
        }

        let results = build_index(&provider, None, &settings(16), 0, &AbortAfterFirstMessage).await.unwrap();

        assert_eq!(results.indexed_upto, 1);
        assert_eq!(provider.get_message_text_index().size().await.unwrap(), 1);
        assert_eq!(provider.get_semantic_ref_collection().size().await.unwrap(), 0);
    }
}
