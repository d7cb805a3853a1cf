//! `SqliteStorageProvider`: the single-file relational backend. One
//! pool, one writer — concurrent opens of the same file by two
//! providers are undefined and must be coordinated by the caller.

use std::sync::Arc;

use async_trait::async_trait;
use km_embedding::{CachingEmbeddingClient, EmbeddingClient};
use km_storage::{
    MessageCollection, MessageTextIndexProvider, PropertyIndexProvider, RelatedTermsIndexProvider, SemanticRefCollection, StorageError,
    StorageProvider, TermIndexProvider, ThreadIndexProvider, TimestampIndexProvider,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::collection::{SqliteMessageCollection, SqliteSemanticRefCollection};
use crate::message_text::SqliteMessageTextIndex;
use crate::pool::open;
use crate::property::SqlitePropertyIndex;
use crate::related_terms::SqliteRelatedTermsIndex;
use crate::term::SqliteTermIndex;
use crate::thread::SqliteThreadIndex;
use crate::timestamp::SqliteTimestampIndex;

pub struct SqliteStorageProvider {
    pool: SqlitePool,
    messages: Arc<SqliteMessageCollection>,
    semantic_refs: Arc<SqliteSemanticRefCollection>,
    term_index: Arc<SqliteTermIndex>,
    property_index: Arc<SqlitePropertyIndex>,
    timestamp_index: Arc<SqliteTimestampIndex>,
    message_text_index: Arc<SqliteMessageTextIndex>,
    related_terms_index: Arc<SqliteRelatedTermsIndex>,
    thread_index: Arc<SqliteThreadIndex>,
}

impl SqliteStorageProvider {
    /// Opens (creating if absent) the database file at `database_url`
    /// and wires every index and collection to the same connection pool.
    ///
    /// `embedding_client` is wrapped in a [`CachingEmbeddingClient`] so the
    /// three embedding-backed indexes share one exact-text cache and see
    /// only unit-normalized vectors (spec.md invariant 6), regardless of
    /// whether the caller's own client already normalizes.
    pub async fn new(database_url: &str, embedding_client: Arc<dyn EmbeddingClient>) -> Result<Self, StorageError> {
        let embedding_client: Arc<dyn EmbeddingClient> = Arc::new(CachingEmbeddingClient::new(embedding_client));
        let pool = open(database_url).await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self {
            messages: Arc::new(SqliteMessageCollection::new(pool.clone())),
            semantic_refs: Arc::new(SqliteSemanticRefCollection::new(pool.clone())),
            term_index: Arc::new(SqliteTermIndex::new(pool.clone())),
            property_index: Arc::new(SqlitePropertyIndex::new(pool.clone())),
            timestamp_index: Arc::new(SqliteTimestampIndex::new(pool.clone())),
            message_text_index: Arc::new(SqliteMessageTextIndex::new(pool.clone(), embedding_client.clone())),
            related_terms_index: Arc::new(SqliteRelatedTermsIndex::new(pool.clone(), embedding_client.clone())),
            thread_index: Arc::new(SqliteThreadIndex::new(pool.clone(), embedding_client)),
            pool,
        })
    }
}

#[async_trait]
impl StorageProvider for SqliteStorageProvider {
    fn get_message_collection(&self) -> Arc<dyn MessageCollection> {
        self.messages.clone()
    }

    fn get_semantic_ref_collection(&self) -> Arc<dyn SemanticRefCollection> {
        self.semantic_refs.clone()
    }

    fn get_term_index(&self) -> Arc<dyn TermIndexProvider> {
        self.term_index.clone()
    }

    fn get_property_index(&self) -> Arc<dyn PropertyIndexProvider> {
        self.property_index.clone()
    }

    fn get_timestamp_index(&self) -> Arc<dyn TimestampIndexProvider> {
        self.timestamp_index.clone()
    }

    fn get_message_text_index(&self) -> Arc<dyn MessageTextIndexProvider> {
        self.message_text_index.clone()
    }

    fn get_related_terms_index(&self) -> Arc<dyn RelatedTermsIndexProvider> {
        self.related_terms_index.clone()
    }

    fn get_thread_index(&self) -> Arc<dyn ThreadIndexProvider> {
        self.thread_index.clone()
    }

    async fn close(&self) -> Result<(), StorageError> {
        if self.pool.is_closed() {
            return Ok(());
        }
        self.pool.close().await;
        info!("closed relational storage provider");
        Ok(())
    }
}
