use std::collections::HashSet;

/// Strips all HTML tags from input (for titles, names and descriptions).
/// Script and style bodies are dropped along with their tags; entities that
/// ammonia emits for the remaining text are decoded back so the stored value
/// is plain text.
pub fn strip_all_html(input: &str) -> String {
    let cleaned = ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}

/// Trims and strips a free-text field. Returns `None` when nothing is left.
pub fn clean_required_text(input: &str) -> Option<String> {
    let cleaned = strip_all_html(input.trim());
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_removed_but_text_survives() {
        assert_eq!(strip_all_html("<b>Spring</b> launch"), "Spring launch");
        assert_eq!(strip_all_html("Q&A <script>alert(1)</script>session"), "Q&A session");
        assert_eq!(strip_all_html("a < b"), "a < b");
    }

    #[test]
    fn blank_after_cleaning_is_rejected() {
        assert_eq!(clean_required_text("   "), None);
        assert_eq!(clean_required_text("<i></i>"), None);
        assert_eq!(clean_required_text("  Reel  ").as_deref(), Some("Reel"));
    }
}
