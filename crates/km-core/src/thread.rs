//! Threads: named groupings of text ranges representing a sub-topic or
//! sub-conversation that spans multiple messages.

use serde::{Deserialize, Serialize};

use crate::text_range::TextRange;

/// A named collection of ranges describing one thread of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub description: String,
    pub ranges: Vec<TextRange>,
}

impl Thread {
    pub fn new(description: impl Into<String>, ranges: Vec<TextRange>) -> Self {
        Self { description: description.into(), ranges }
    }

    pub fn covers(&self, range: &TextRange) -> bool {
        self.ranges.iter().any(|r| r.overlaps_with(range))
    }
}
