//! Single-file relational `StorageProvider`, backed by `sqlx`/SQLite.
//! Persistent, single-writer; all collections and indexes are views over
//! one connection pool shared by every table in §6's schema.

pub mod collection;
pub mod message_text;
pub mod pool;
pub mod property;
pub mod provider;
pub mod related_terms;
pub mod term;
pub mod thread;
pub mod timestamp;

pub use collection::{SqliteMessageCollection, SqliteSemanticRefCollection};
pub use message_text::SqliteMessageTextIndex;
pub use pool::open;
pub use property::SqlitePropertyIndex;
pub use provider::SqliteStorageProvider;
pub use related_terms::SqliteRelatedTermsIndex;
pub use term::SqliteTermIndex;
pub use thread::SqliteThreadIndex;
pub use timestamp::SqliteTimestampIndex;
