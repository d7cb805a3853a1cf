//! The storage-provider abstraction shared by both backends
//! (`km-storage-memory`, `km-storage-sqlite`): the append-only
//! collection traits, the six secondary-index provider traits, the
//! `StorageProvider` trait that bundles them, and the portable snapshot
//! format used to move a conversation between them.

pub mod collection;
pub mod error;
pub mod indexes;
pub mod provider;
pub mod snapshot;

pub use collection::{MessageCollection, SemanticRefCollection};
pub use error::{DeserializationError, StorageError};
pub use indexes::{
    MessageTextIndexProvider, PropertyIndexProvider, RelatedTermsIndexProvider, TermIndexProvider, ThreadIndexProvider, TimestampIndexProvider,
};
pub use provider::StorageProvider;
pub use snapshot::{
    build_snapshot, load_snapshot, read_snapshot_files, write_snapshot_files, ConversationSnapshotJson, LoadedSnapshot, SnapshotInput, SnapshotPaths,
};
