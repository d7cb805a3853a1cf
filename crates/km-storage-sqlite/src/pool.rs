//! Connection setup and schema initialization for the single-file
//! relational backend.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tracing::info;

/// Opens (creating if absent) the database at `database_url` and ensures
/// its schema exists. Safe to call against an already-initialized file.
pub async fn open(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new().create_if_missing(true).filename(database_url);
    let pool = SqlitePool::connect_with(options).await?;
    init_schema(&pool).await?;
    info!(database_url, "opened relational storage provider");
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Messages (
            msg_id INTEGER PRIMARY KEY,
            chunks TEXT NOT NULL,
            extra TEXT NOT NULL,
            tags TEXT NOT NULL,
            metadata TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS SemanticRefs (
            sem_ref_id INTEGER PRIMARY KEY,
            range_json TEXT NOT NULL,
            knowledge_type TEXT NOT NULL,
            knowledge_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_semantic_refs_type ON SemanticRefs(knowledge_type);

        CREATE TABLE IF NOT EXISTS TermIndex (
            term TEXT NOT NULL,
            sem_ref_id INTEGER NOT NULL,
            score REAL,
            PRIMARY KEY(term, sem_ref_id)
        );

        CREATE TABLE IF NOT EXISTS PropertyIndex (
            prop_name TEXT NOT NULL,
            prop_value TEXT NOT NULL,
            sem_ref_id INTEGER NOT NULL,
            PRIMARY KEY(prop_name, prop_value, sem_ref_id)
        );

        CREATE TABLE IF NOT EXISTS TimestampIndex (
            msg_id INTEGER PRIMARY KEY,
            timestamp TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_timestamp_index_ts ON TimestampIndex(timestamp);

        CREATE TABLE IF NOT EXISTS MessageTextIndex (
            msg_id INTEGER NOT NULL,
            chunk_ordinal INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY(msg_id, chunk_ordinal)
        );

        CREATE TABLE IF NOT EXISTS RelatedTermsAliases (
            term TEXT NOT NULL,
            related_text TEXT NOT NULL,
            weight REAL,
            PRIMARY KEY(term, related_text)
        );

        CREATE TABLE IF NOT EXISTS RelatedTermsFuzzy (
            term TEXT PRIMARY KEY,
            embedding BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Threads (
            thread_id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            embedding BLOB NOT NULL,
            ranges_json TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Packs a `Vec<f32>` into the little-endian blob the schema stores
/// embeddings as.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Inverse of [`encode_embedding`]. Truncates any trailing bytes that
/// don't form a complete `f32` rather than erroring, matching the
/// teacher's blob-decoding leniency.
pub fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4).map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opening_twice_against_same_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_str().unwrap().to_string();
        open(&path).await.unwrap();
        open(&path).await.unwrap();
    }

    #[test]
    fn embedding_round_trips_through_blob() {
        let vector = vec![0.5f32, -1.25, 3.0];
        let blob = encode_embedding(&vector);
        assert_eq!(decode_embedding(&blob), vector);
    }
}
