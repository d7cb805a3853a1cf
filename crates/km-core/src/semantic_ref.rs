//! `SemanticRef`: a piece of extracted knowledge anchored to a text range.

use serde::{Deserialize, Serialize};

use crate::knowledge::Knowledge;
use crate::text_range::TextRange;

/// One extracted fact, anchored to the message text it came from.
///
/// `semantic_ref_ordinal` is this ref's own position in the conversation's
/// semantic-ref collection, assigned at append time and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticRef {
    pub semantic_ref_ordinal: usize,
    pub range: TextRange,
    pub knowledge: Knowledge,
}

impl SemanticRef {
    pub fn new(semantic_ref_ordinal: usize, range: TextRange, knowledge: Knowledge) -> Self {
        Self { semantic_ref_ordinal, range, knowledge }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Tag;
    use crate::text_range::TextLocation;

    #[test]
    fn carries_its_own_ordinal() {
        let sr = SemanticRef::new(
            7,
            TextRange::for_message(2),
            Knowledge::Tag(Tag { text: "funny".to_string() }),
        );
        assert_eq!(sr.semantic_ref_ordinal, 7);
        assert!(sr.range.contains(&TextLocation::new(2)));
    }
}
