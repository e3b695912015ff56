//! Helpers for normalizing extracted text.

/// Maximum number of characters kept in a record's text snippet.
pub const SNIPPET_CHARS: usize = 200;

/// Collapse every whitespace run to a single space and trim both ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Take at most `max_chars` characters from the start of `text`.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_and_trims() {
        assert_eq!(clean_text("a   b\n\nc"), "a b c");
        assert_eq!(clean_text("  \t leading and trailing \r\n"), "leading and trailing");
        assert_eq!(clean_text(" \n\t "), "");
    }

    #[test]
    fn clean_text_is_idempotent() {
        let samples = [
            "",
            "plain",
            "a   b\n\nc",
            "\u{00a0}non\u{2003}breaking\u{00a0}",
            "tabs\t\tand\nnewlines\r\n",
        ];
        for sample in samples {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("short", SNIPPET_CHARS), "short");
        assert_eq!(snippet("abcdef", 3), "abc");

        let accented = "é".repeat(250);
        let cut = snippet(&accented, SNIPPET_CHARS);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
    }
}
