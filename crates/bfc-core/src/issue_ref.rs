//! Issue reference extraction from commit messages.

use regex::Regex;
use std::sync::OnceLock;

fn issue_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([0-9]+)").expect("issue pattern is valid"))
}

/// Digits of the first `#<digits>` reference in `message`.
///
/// Later references are ignored; a bare `#` is not a reference.
pub fn extract_issue_id(message: &str) -> Option<String> {
    issue_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_reference() {
        assert_eq!(extract_issue_id("Fix bug #123"), Some("123".to_string()));
    }

    #[test]
    fn test_only_first_reference_is_used() {
        assert_eq!(
            extract_issue_id("Fix bug #123 and #456"),
            Some("123".to_string())
        );
    }

    #[test]
    fn test_no_reference() {
        assert_eq!(extract_issue_id("Fix a bug"), None);
    }

    #[test]
    fn test_marker_without_digits_is_skipped() {
        assert_eq!(extract_issue_id("Fix # of retries"), None);
        assert_eq!(extract_issue_id("see #abc then #42"), Some("42".to_string()));
    }

    #[test]
    fn test_only_ascii_digits_form_a_reference() {
        assert_eq!(extract_issue_id("Fix #\u{663}\u{664}"), None);
        assert_eq!(extract_issue_id("Fix #\u{663} then #12"), Some("12".to_string()));
        assert_eq!(extract_issue_id("Fix #\u{ff11}\u{ff12}"), None);
    }

    #[test]
    fn test_reference_in_body() {
        assert_eq!(
            extract_issue_id("Guard against null\n\nCloses #7"),
            Some("7".to_string())
        );
    }
}
