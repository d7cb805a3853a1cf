//! In-memory `StorageProvider`: thin async wrappers around `km-index`'s
//! synchronous index structures, behind `tokio::sync::RwLock`. Fastest
//! backend available, no persistence — the default for tests and for
//! conversations small enough to keep entirely in memory.

pub mod collection;
pub mod message_text;
pub mod property;
pub mod provider;
pub mod related_terms;
pub mod term;
pub mod thread;
pub mod timestamp;

pub use collection::{InMemoryMessageCollection, InMemorySemanticRefCollection};
pub use message_text::InMemoryMessageTextIndex;
pub use property::InMemoryPropertyIndex;
pub use provider::InMemoryStorageProvider;
pub use related_terms::InMemoryRelatedTermsIndex;
pub use term::InMemoryTermIndex;
pub use thread::InMemoryThreadIndex;
pub use timestamp::InMemoryTimestampIndex;
