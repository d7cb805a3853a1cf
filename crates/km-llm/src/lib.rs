//! Knowledge extraction for the conversational knowledge memory: the
//! client seam (`LlmClient`) and response parsing/validation.

pub mod client;
pub mod error;
pub mod response;
pub mod retry;
pub mod test_client;

pub use client::LlmClient;
pub use error::ExtractionError;
pub use response::parse_knowledge_response;
pub use retry::with_retry;
pub use test_client::DeterministicTestLlmClient;
