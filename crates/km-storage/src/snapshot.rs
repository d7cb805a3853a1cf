//! The portable snapshot format (spec.md §6): a JSON body plus a binary
//! embeddings sidecar, usable as a relational-independent backup for
//! either storage backend.
//!
//! Property and timestamp index data are deliberately absent from this
//! format — spec.md's JSON shape names only `semanticIndexData`,
//! `relatedTermsIndexData` and `messageIndexData`. Both omitted indexes
//! are cheaply rebuilt from `messages`/`semanticRefs` on load (see
//! `km-conversation`), so there is nothing backend-specific to round-trip
//! for them. Threads are likewise absent: spec.md's §4.7 calls them
//! optional and non-primary, and no `threadData` field appears in the
//! snapshot shape — the relational backend persists them in its own
//! `Threads` table instead (spec.md §6), a deliberate asymmetry.

use std::path::{Path, PathBuf};

use km_core::{Knowledge, KnowledgeType, Message, SemanticRef, TextRange};
use km_index::{AliasData, MessageTextIndexData, SemanticIndexData};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::error::DeserializationError;

const FILE_VERSION: &str = "0.1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileHeader {
    version: String,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self { version: FILE_VERSION.to_string() }
    }
}

/// One semantic ref as it appears in the snapshot: `knowledgeType` is a
/// sibling field rather than embedded in `knowledge`'s own JSON, since
/// that's the wire shape spec.md §6 specifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SemanticRefEnvelope {
    semantic_ref_ordinal: usize,
    range: TextRange,
    knowledge_type: String,
    knowledge: serde_json::Value,
}

fn knowledge_type_str(t: KnowledgeType) -> &'static str {
    match t {
        KnowledgeType::Entity => "entity",
        KnowledgeType::Action => "action",
        KnowledgeType::Topic => "topic",
        KnowledgeType::Tag => "tag",
    }
}

fn semantic_ref_to_envelope(semantic_ref: &SemanticRef) -> Result<SemanticRefEnvelope, serde_json::Error> {
    let knowledge = match &semantic_ref.knowledge {
        Knowledge::Entity(e) => serde_json::to_value(e)?,
        Knowledge::Action(a) => serde_json::to_value(a)?,
        Knowledge::Topic(t) => serde_json::to_value(t)?,
        Knowledge::Tag(t) => serde_json::to_value(t)?,
    };
    Ok(SemanticRefEnvelope {
        semantic_ref_ordinal: semantic_ref.semantic_ref_ordinal,
        range: semantic_ref.range,
        knowledge_type: knowledge_type_str(semantic_ref.knowledge.knowledge_type()).to_string(),
        knowledge,
    })
}

fn envelope_to_semantic_ref(envelope: SemanticRefEnvelope) -> Result<SemanticRef, serde_json::Error> {
    let knowledge = match envelope.knowledge_type.as_str() {
        "entity" => Knowledge::Entity(serde_json::from_value(envelope.knowledge)?),
        "action" => Knowledge::Action(serde_json::from_value(envelope.knowledge)?),
        "topic" => Knowledge::Topic(serde_json::from_value(envelope.knowledge)?),
        "tag" => Knowledge::Tag(serde_json::from_value(envelope.knowledge)?),
        other => return Err(serde_json::Error::custom(format!("unknown knowledgeType `{other}`"))),
    };
    Ok(SemanticRef::new(envelope.semantic_ref_ordinal, envelope.range, knowledge))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextEmbeddingData {
    text_items: Vec<String>,
    embeddings: (),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedTermsIndexDataJson {
    alias_data: AliasData,
    text_embedding_data: TextEmbeddingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageTextIndexDataJson {
    index_data: MessageTextEntryData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageTextEntryData {
    #[serde(flatten)]
    locations: MessageTextIndexData,
    embeddings: (),
}

/// The full JSON body of a snapshot (`{prefix}_data.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshotJson {
    name_tag: String,
    tags: Vec<String>,
    messages: Vec<Message>,
    semantic_refs: Vec<SemanticRefEnvelope>,
    semantic_index_data: SemanticIndexData,
    related_terms_index_data: RelatedTermsIndexDataJson,
    message_index_data: MessageTextIndexDataJson,
    file_header: FileHeader,
}

/// Everything needed to reconstruct a conversation and its embedding-
/// backed indexes after loading a snapshot: the plain data plus the two
/// embedding vector sets, already split out of the sidecar in the order
/// they were declared (fuzzy related-terms first, then message text).
pub struct LoadedSnapshot {
    pub name_tag: String,
    pub tags: Vec<String>,
    pub messages: Vec<Message>,
    pub semantic_refs: Vec<SemanticRef>,
    pub semantic_index_data: SemanticIndexData,
    pub alias_data: AliasData,
    pub fuzzy_term_texts: Vec<String>,
    pub fuzzy_term_vectors: Vec<Vec<f32>>,
    pub message_locations: MessageTextIndexData,
    pub message_vectors: Vec<Vec<f32>>,
}

/// Everything needed to produce a snapshot from a live conversation.
pub struct SnapshotInput<'a> {
    pub name_tag: &'a str,
    pub tags: &'a [String],
    pub messages: &'a [Message],
    pub semantic_refs: &'a [SemanticRef],
    pub semantic_index_data: SemanticIndexData,
    pub alias_data: AliasData,
    pub fuzzy_term_texts: Vec<String>,
    pub fuzzy_term_vectors: Vec<Vec<f32>>,
    pub message_locations: MessageTextIndexData,
    pub message_vectors: Vec<Vec<f32>>,
}

/// Builds the JSON body and the ordered embedding vectors (fuzzy terms
/// then message-text chunks) for `input`.
pub fn build_snapshot(input: SnapshotInput<'_>) -> Result<(ConversationSnapshotJson, Vec<Vec<f32>>), serde_json::Error> {
    let semantic_refs =
        input.semantic_refs.iter().map(semantic_ref_to_envelope).collect::<Result<Vec<_>, _>>()?;

    let json = ConversationSnapshotJson {
        name_tag: input.name_tag.to_string(),
        tags: input.tags.to_vec(),
        messages: input.messages.to_vec(),
        semantic_refs,
        semantic_index_data: input.semantic_index_data,
        related_terms_index_data: RelatedTermsIndexDataJson {
            alias_data: input.alias_data,
            text_embedding_data: TextEmbeddingData { text_items: input.fuzzy_term_texts.clone(), embeddings: () },
        },
        message_index_data: MessageTextIndexDataJson {
            index_data: MessageTextEntryData { locations: input.message_locations.clone(), embeddings: () },
        },
        file_header: FileHeader::default(),
    };

    let mut sidecar_vectors = input.fuzzy_term_vectors;
    sidecar_vectors.extend(input.message_vectors);
    Ok((json, sidecar_vectors))
}

/// Parses `json` and slices `sidecar` into the fuzzy-term and
/// message-text vector sets using the declared text-item counts and
/// `dimension`. A sidecar whose total length disagrees with the
/// declared counts is a fatal `DeserializationError`.
pub fn load_snapshot(json: ConversationSnapshotJson, sidecar: &[u8], dimension: usize) -> Result<LoadedSnapshot, DeserializationError> {
    if json.file_header.version != FILE_VERSION {
        return Err(DeserializationError::UnsupportedVersion(json.file_header.version));
    }

    let semantic_refs = json
        .semantic_refs
        .into_iter()
        .map(envelope_to_semantic_ref)
        .collect::<Result<Vec<_>, _>>()
        .map_err(DeserializationError::Json)?;

    let fuzzy_term_texts = json.related_terms_index_data.text_embedding_data.text_items;
    let message_locations = json.message_index_data.index_data.locations;
    let message_count = message_locations.text_locations.len();
    let fuzzy_count = fuzzy_term_texts.len();

    let expected_floats = (fuzzy_count + message_count) * dimension;
    if sidecar.len() % 4 != 0 || sidecar.len() / 4 != expected_floats {
        return Err(DeserializationError::EmbeddingSidecarLengthMismatch {
            what: "combined fuzzy + message-text embeddings".to_string(),
            expected: expected_floats,
            got: sidecar.len() / 4,
        });
    }

    let all_vectors = decode_vectors(sidecar, dimension);
    let (fuzzy_term_vectors, message_vectors) = all_vectors.split_at(fuzzy_count);

    Ok(LoadedSnapshot {
        name_tag: json.name_tag,
        tags: json.tags,
        messages: json.messages,
        semantic_refs,
        semantic_index_data: json.semantic_index_data,
        alias_data: json.related_terms_index_data.alias_data,
        fuzzy_term_texts,
        fuzzy_term_vectors: fuzzy_term_vectors.to_vec(),
        message_locations,
        message_vectors: message_vectors.to_vec(),
    })
}

fn encode_vectors(vectors: &[Vec<f32>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vectors.iter().map(|v| v.len() * 4).sum());
    for vector in vectors {
        for component in vector {
            bytes.extend_from_slice(&component.to_le_bytes());
        }
    }
    bytes
}

fn decode_vectors(bytes: &[u8], dimension: usize) -> Vec<Vec<f32>> {
    if dimension == 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(dimension * 4)
        .map(|chunk| chunk.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect())
        .collect()
}

/// The two file paths a snapshot prefix expands to.
pub struct SnapshotPaths {
    pub data_path: PathBuf,
    pub embeddings_path: PathBuf,
}

impl SnapshotPaths {
    pub fn new(prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref();
        let mut data = prefix.as_os_str().to_owned();
        data.push("_data.json");
        let mut embeddings = prefix.as_os_str().to_owned();
        embeddings.push("_embeddings.bin");
        Self { data_path: PathBuf::from(data), embeddings_path: PathBuf::from(embeddings) }
    }
}

/// Writes both snapshot files for `prefix`.
pub async fn write_snapshot_files(prefix: impl AsRef<Path>, json: &ConversationSnapshotJson, vectors: &[Vec<f32>]) -> Result<(), std::io::Error> {
    let paths = SnapshotPaths::new(prefix);
    let body = serde_json::to_vec_pretty(json).expect("ConversationSnapshotJson always serializes");
    tokio::fs::write(&paths.data_path, body).await?;
    tokio::fs::write(&paths.embeddings_path, encode_vectors(vectors)).await?;
    Ok(())
}

/// Reads both snapshot files for `prefix` and assembles a
/// [`LoadedSnapshot`], given the embedding dimension the provider was
/// configured with.
pub async fn read_snapshot_files(prefix: impl AsRef<Path>, dimension: usize) -> Result<LoadedSnapshot, DeserializationError> {
    let paths = SnapshotPaths::new(prefix);
    let body = tokio::fs::read(&paths.data_path).await.map_err(DeserializationError::Io)?;
    let json: ConversationSnapshotJson = serde_json::from_slice(&body).map_err(DeserializationError::Json)?;
    let sidecar = tokio::fs::read(&paths.embeddings_path).await.map_err(DeserializationError::Io)?;
    load_snapshot(json, &sidecar, dimension)
}
