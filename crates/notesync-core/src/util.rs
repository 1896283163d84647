//! Small text and clock helpers shared across modules.

/// Trim optional text, treating blank input as absent.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Whether `haystack` contains `needle` ignoring case.
///
/// `needle` must already be lowercased. Folding uses Unicode lowercase
/// mappings, not just ASCII.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_trims_and_rejects_blank() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" groceries ".to_string())),
            Some("groceries".to_string())
        );
    }

    #[test]
    fn contains_folded_handles_non_ascii() {
        assert!(contains_folded("Über Straße", "über"));
        assert!(contains_folded("ÄRGER", "ärger"));
        assert!(contains_folded("anything", ""));
        assert!(!contains_folded("Uber", "über"));
    }
}
