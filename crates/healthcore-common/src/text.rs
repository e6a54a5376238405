//! Small text helpers shared by the prompt builders and renderers.

/// Returns at most `max_chars` characters of `text`, never splitting a
/// multi-byte character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_chars("BP 120/80", 100), "BP 120/80");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        // "°" is two bytes in UTF-8
        let text = "98.6°F fever";
        assert_eq!(truncate_chars(text, 5), "98.6°");
        assert_eq!(truncate_chars(text, 0), "");
    }

    #[test]
    fn test_exact_length() {
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
