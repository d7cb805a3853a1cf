//! The single entry point applications use: `Conversation` wires a
//! storage provider (`km-storage-memory` or `km-storage-sqlite`), the
//! indexing pipeline (`km-pipeline`), and an embedding/LLM client pair
//! together behind one façade.
//!
//! Every other crate in this workspace defines its own `thiserror` error
//! type scoped to its concern; this crate is the one place that
//! aggregates failures from several of them at once, so its public
//! functions return `anyhow::Result` rather than adding yet another enum
//! on top.

pub mod conversation;

pub use conversation::Conversation;
