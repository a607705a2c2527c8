// Text clean-up for user-supplied fields

/// Trim and drop control characters (newlines and tabs are kept)
pub fn clean_text(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

/// Clean an optional field, mapping blank values to `None`
pub fn clean_optional(text: Option<String>) -> Option<String> {
    text.map(|t| clean_text(&t)).filter(|t| !t.is_empty())
}

/// Truncate text to at most `max_chars` characters, marking the cut with "..."
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
