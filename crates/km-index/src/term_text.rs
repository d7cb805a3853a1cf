//! Case-folding and whitespace normalization shared by every index whose
//! keys are term text (the primary term index, the property index's
//! value half, the aliases index).

/// Lowercases `text` and collapses runs of whitespace to a single space,
/// trimming the ends. Multi-word terms (e.g. joined action verbs) stay a
/// single key rather than being split on the space.
pub fn normalize_term_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                out.push(' ');
                prev_was_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            prev_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize_term_text("  Bach  "), "bach");
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize_term_text("pick   up"), "pick up");
    }

    #[test]
    fn keeps_multi_word_terms_as_one_key() {
        assert_eq!(normalize_term_text("New York City"), "new york city");
    }
}
